pub mod auth;
mod batch;
mod error;
mod folders;
pub mod gallery;
mod transfer;
mod types;

pub use batch::{AssetTransfer, UploadBatch};
pub use error::{DriveError, TransferFailure};
pub use folders::FolderResolver;
pub use gallery::GalleryClient;
pub use transfer::ResumableTransfer;
pub use types::{Asset, BatchOutcome, DriveFile, FileProgress, UploadPhase};
