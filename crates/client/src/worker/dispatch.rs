//! Control message dispatch.

use super::{ControlMessage, Worker};
use uninav_core::Error;

impl Worker {
    /// Handle one message from a page.
    ///
    /// Replies are broadcast to every client; subscribe before posting to see them.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a prefetch request that can't be planned,
    /// and cache errors from clearing or activating.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<(), Error> {
        match message {
            ControlMessage::PrefetchTiles { bbox, zooms, urls } => {
                self.prefetch_tiles(bbox, &zooms, &urls).await?;
            }
            ControlMessage::ClearTileCache => self.clear_tile_cache().await?,
            ControlMessage::SkipWaiting => {
                self.skip_waiting().await?;
            }
            ControlMessage::Unknown => tracing::debug!("ignoring unknown control message"),
        }
        Ok(())
    }
}
