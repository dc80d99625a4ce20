//! ArtTrigger handler interface.

/// Receives ArtTrigger commands that passed the OEM filter.
///
/// Invoked synchronously from `ArtNetController::receive_and_dispatch`.
/// Closures with the matching signature implement it directly.
pub trait TriggerHandler {
    /// Handle one trigger: key, sub-key and payload (up to 512 bytes).
    fn handle(&mut self, key: u8, sub_key: u8, payload: &[u8]);
}

impl<F> TriggerHandler for F
where
    F: FnMut(u8, u8, &[u8]),
{
    fn handle(&mut self, key: u8, sub_key: u8, payload: &[u8]) {
        self(key, sub_key, payload)
    }
}
