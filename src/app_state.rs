use crate::cli::CommandLineArgs;
use crate::error::XRayError;
use crate::store::Store;

use expanduser::expanduser;
use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Record store.
    pub store: Store,
}

impl AppState {
    /// Create and return an [AppState].
    ///
    /// Opens the store at the configured data path, or a temporary store if requested.
    pub fn new(args: &CommandLineArgs) -> Result<Self, XRayError> {
        let store = if args.temporary_storage {
            Store::temporary()?
        } else {
            let path = expanduser(&args.data_path).map_err(|err| XRayError::Storage(err.into()))?;
            Store::open(&path)?
        };
        Ok(Self::with_store(args, store))
    }

    /// Create and return an [AppState] using an existing store.
    pub fn with_store(args: &CommandLineArgs, store: Store) -> Self {
        Self {
            args: args.clone(),
            store,
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
