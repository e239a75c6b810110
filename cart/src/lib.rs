pub mod codec;
pub mod domain;
pub mod instrumented;
pub mod persistence;
pub mod ports;

pub use domain::{Cart, CartItem};
pub use instrumented::InstrumentedCartStore;
pub use persistence::{KvCartStore, StoreOptions};
pub use ports::{CartStore, KeyValueBackend};
