mod extension;
mod factory;
mod known;

pub use self::extension::{ExtensionRegistry, InvalidExtensionError};
pub use self::factory::{AnyMessage, MessageFactory};
pub use self::known::{KnownMessage, KnownTypeRegistry};
