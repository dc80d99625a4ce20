//! Subscriber directory interface.
//!
//! The controller asks the directory which nodes listen to a universe and
//! feeds it every ArtPollReply it receives. Storage and eviction policy are
//! up to the implementation; [`crate::poll_table::PollTable`] is the
//! fixed-capacity one shipped with the binary.

use std::net::Ipv4Addr;

use crate::packet::ArtPollReply;

/// Universe -> subscriber address lookup, fed by discovery replies.
pub trait Directory {
    /// Record or refresh the sender of `reply` under every universe it
    /// outputs. `now_millis` is the controller clock.
    fn add(&mut self, reply: &ArtPollReply<'_>, now_millis: u32);

    /// Subscribers of `universe`, or `None` if no node announced it.
    fn lookup(&self, universe: u16) -> Option<&[Ipv4Addr]>;

    /// Expire nodes that have not re-announced within the timeout window.
    /// Must be bounded by the directory size.
    fn sweep(&mut self, now_millis: u32);
}

impl<D: Directory + ?Sized> Directory for Box<D> {
    fn add(&mut self, reply: &ArtPollReply<'_>, now_millis: u32) {
        (**self).add(reply, now_millis)
    }

    fn lookup(&self, universe: u16) -> Option<&[Ipv4Addr]> {
        (**self).lookup(universe)
    }

    fn sweep(&mut self, now_millis: u32) {
        (**self).sweep(now_millis)
    }
}
