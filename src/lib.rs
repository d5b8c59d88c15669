pub mod bootstrap;
pub mod config;
pub mod error;
pub mod patch;
pub mod pool;
pub mod secret;
pub mod url;

pub use bootstrap::{
    Bootstrap, BootstrapReport, BootstrapState, FnProvider, PoolProvider, SecretStatus,
};
pub use config::{
    EncDbConfig, CONFIG_FILE_PROPERTY, DEFAULT_CONFIG_PATH, DEFAULT_DRIVER_CLASS, DEFAULT_ENC_ALGO,
};
pub use error::{EncDbError, Result};
pub use patch::{FieldOutcome, PoolPatchReport, PoolPatcher, SkipReason};
pub use pool::{AdapterRegistry, FieldAccess, NoopAdapter, PoolAdapter, PoolHandle};
pub use secret::{provision, MasterKey, SecretOutcome};
pub use url::{to_encdb_url, ENCDB_URL_PREFIX, PLAIN_URL_PREFIX};
