pub mod restore_asset;

pub use restore_asset::{
    DEFAULT_FETCH_DELAY, FetchPacer, RestoreAssetOperation, RestoreAssetOperationRequest,
    RestoreAssetOperationResult,
};
