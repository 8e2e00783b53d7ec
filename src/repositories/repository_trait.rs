use async_trait::async_trait;
use crate::errors::TrackerResult;

/// Defines a generic asynchronous repository interface over one worksheet
///
/// Each implementation owns the codec between its item type and the text cells of a sheet row.
#[async_trait]
pub trait Repository<T>: Send + Sync
    where
        T: Send + Sync,
{
    /// Reads every item of the worksheet, in sheet order
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<T>)`: The decoded items; the header row is never returned
    /// * `Err(TrackerError)` if the worksheet cannot be read
    async fn list_all(&self) -> TrackerResult<Vec<T>>;

    /// Appends a single item after the last row
    ///
    /// # Arguments
    ///
    /// * `item`: A reference to the item of type `T` to be appended
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the item was written
    /// * `Err(TrackerError)` if the item violates a constraint of the worksheet or the write fails
    async fn append(&self, item: &T) -> TrackerResult<()>;
}
