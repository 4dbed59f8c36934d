use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

/// An entity with its unique ID, as handed out by the store.
///
/// `T` holds the entity data; the ID is assigned at creation and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: u32,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(id: u32, data: T) -> Self {
        Self { id, data }
    }
}

impl<T> Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for Record<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}
