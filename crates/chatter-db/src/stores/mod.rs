//! Entity stores.
//!
//! Each store is a trait with a blanket impl over every [`Connector`], so the
//! selected [`crate::Provider`] (or any single backend) exposes the whole
//! contract. Reads go to `replica()`, writes to `master()`, and every
//! multi-statement write runs in one [`crate::with_transaction`] scope.
//!
//! [`Connector`]: crate::Connector

mod block_user;
mod device;
mod room;
mod room_user;
mod setting;
mod subscription;
mod user;
mod user_role;

pub use block_user::BlockUserStore;
pub use device::DeviceStore;
pub use room::RoomStore;
pub use room_user::RoomUserStore;
pub use setting::SettingStore;
pub use subscription::SubscriptionStore;
pub use user::{UserExpansions, UserStore};
pub use user_role::UserRoleStore;

/// How a bulk insert into a join table treats rows that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPolicy {
    /// Remove every existing row of the affected owners, then insert the set.
    CleanThenInsert,
    /// Skip pairs that already exist, insert the rest.
    #[default]
    DedupeOnInsert,
}

/// The full store contract.
pub trait Store:
    BlockUserStore
    + DeviceStore
    + RoomStore
    + RoomUserStore
    + SettingStore
    + SubscriptionStore
    + UserStore
    + UserRoleStore
{
}

impl<T> Store for T where
    T: BlockUserStore
        + DeviceStore
        + RoomStore
        + RoomUserStore
        + SettingStore
        + SubscriptionStore
        + UserStore
        + UserRoleStore
        + ?Sized
{
}
