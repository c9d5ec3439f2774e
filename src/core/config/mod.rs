pub mod properties;

pub use properties::{
    apply_server_config, patch_auth_toggle, patch_server_config, set_property, toggle_auth,
    AuthStatus,
};
