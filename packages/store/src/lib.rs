pub mod backend;
mod collection;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod normalize;
pub mod remote;
pub mod storage;
pub mod upload;
pub mod wall;
pub mod wishes;

mod memory;
pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
mod file_store;
#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod local_storage;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use local_storage::LocalStorageStore;

pub use backend::{LocalWall, WallBackend, WALL_STORAGE_KEY};
pub use config::{CloudinaryConfig, StoreConfig};
pub use error::{StoreError, UploadError};
pub use events::{ChangeNotifier, ChangeSignal, Subscription};
pub use models::{
    BirthdayWish, NewWallEntry, NewWish, WallEntry, WallImage, ANONYMOUS, MAX_IMAGES,
    MIN_MESSAGE_CHARS,
};
pub use remote::RemoteWall;
pub use storage::{KeyValueStore, StorageEvent, StorageEvents};
pub use upload::{UploadFile, Uploader};
pub use wall::{StoreMode, WallStore};
pub use wishes::{wishes_key, WishStore};
