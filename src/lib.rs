pub mod dispatch;
pub mod handlers;
pub mod normalize;
pub mod registry;

pub use dispatch::{
    Activation, Dispatcher, MenuContext, MenuEntries, MenuEntry, MenuHost, TabOpener,
    register_menu,
};
pub use handlers::{AppState, router};
pub use normalize::{FilterKind, fold_diacritics, normalize};
pub use registry::{LookupTarget, Registry, RegistryError};
