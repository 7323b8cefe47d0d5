//! Composite fan-out of pulses to many decoders
//!
//! A [`DecoderGroup`] lets one pulse source drive any number of protocol
//! decoders, with members switchable between active (receiving pulses) and
//! passive (attached but muted). Membership is by handle identity.

use std::rc::Rc;

use crate::protocol::{DecoderHandle, ProtocolDecoder, ProtocolInfo, SinkRef};

/// An ordered group of protocol decoders that is itself a decoder.
///
/// This is a plain composite, not an arbitration scheme: `parse` forwards
/// each pulse to every active member in insertion order and returns the
/// state code of the last member invoked, which is not a meaningful
/// aggregate. Callers that need per-protocol status must query the members
/// individually.
#[derive(Default)]
pub struct DecoderGroup {
    active: Vec<DecoderHandle>,
    passive: Vec<DecoderHandle>,
}

impl DecoderGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decoder as an active member.
    pub fn add(&mut self, decoder: DecoderHandle) {
        self.active.push(decoder);
    }

    /// Remove a decoder from whichever set holds it. Returns false if the
    /// decoder is not a member.
    pub fn remove(&mut self, decoder: &DecoderHandle) -> bool {
        let before = self.active.len() + self.passive.len();
        self.active.retain(|d| !Rc::ptr_eq(d, decoder));
        self.passive.retain(|d| !Rc::ptr_eq(d, decoder));
        self.active.len() + self.passive.len() != before
    }

    /// Move a decoder into the active or passive set. A decoder already in
    /// the requested set stays put, without duplicate insertion; one that
    /// is not yet a member is inserted.
    pub fn set_active(&mut self, decoder: &DecoderHandle, active: bool) {
        let (other, target) = if active {
            (&mut self.passive, &mut self.active)
        } else {
            (&mut self.active, &mut self.passive)
        };
        other.retain(|d| !Rc::ptr_eq(d, decoder));
        if !target.iter().any(|d| Rc::ptr_eq(d, decoder)) {
            target.push(decoder.clone());
        }
    }

    pub fn is_active(&self, decoder: &DecoderHandle) -> bool {
        self.active.iter().any(|d| Rc::ptr_eq(d, decoder))
    }

    /// All members, active first, then passive.
    pub fn decoders(&self) -> Vec<DecoderHandle> {
        self.active
            .iter()
            .chain(self.passive.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.passive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.passive.is_empty()
    }
}

impl ProtocolDecoder for DecoderGroup {
    fn info(&self) -> ProtocolInfo {
        ProtocolInfo::new("DecoderGroup", "Composite", "", 0, 0)
    }

    fn set_target(&mut self, sink: SinkRef) {
        for decoder in self.active.iter().chain(self.passive.iter()) {
            decoder.borrow_mut().set_target(sink.clone());
        }
    }

    fn parse(&mut self, pulse_length: f64, is_mark: bool) -> u32 {
        let mut state = 0;
        for decoder in &self.active {
            state = decoder.borrow_mut().parse(pulse_length, is_mark);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::message::DecodedMessage;
    use crate::protocol::ProtocolDecoderSink;

    struct CountingDecoder {
        pulses: u32,
        state: u32,
        has_sink: bool,
    }

    impl CountingDecoder {
        fn new(state: u32) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                pulses: 0,
                state,
                has_sink: false,
            }))
        }
    }

    impl ProtocolDecoder for CountingDecoder {
        fn info(&self) -> ProtocolInfo {
            ProtocolInfo::new("Counting", "Test", "", 0, 0)
        }

        fn set_target(&mut self, _sink: SinkRef) {
            self.has_sink = true;
        }

        fn parse(&mut self, _pulse_length: f64, _is_mark: bool) -> u32 {
            self.pulses += 1;
            self.state
        }
    }

    struct NullSink;

    impl ProtocolDecoderSink for NullSink {
        fn parsed_message(&mut self, _message: DecodedMessage) {}
        fn partially_parsed_message(&mut self, _protocol: &str, _bits: u32) {}
        fn report_level(&mut self, _level: i32) {}
    }

    fn group_of_three() -> (
        DecoderGroup,
        Rc<RefCell<CountingDecoder>>,
        Rc<RefCell<CountingDecoder>>,
        Rc<RefCell<CountingDecoder>>,
    ) {
        let a = CountingDecoder::new(1);
        let b = CountingDecoder::new(2);
        let c = CountingDecoder::new(3);
        let mut group = DecoderGroup::new();
        group.add(a.clone());
        group.add(b.clone());
        group.add(c.clone());
        (group, a, b, c)
    }

    #[test]
    fn parse_reaches_only_active_members() {
        let (mut group, a, b, c) = group_of_three();
        let c_handle: DecoderHandle = c.clone();
        group.set_active(&c_handle, false);

        group.parse(100.0, true);

        assert_eq!(a.borrow().pulses, 1);
        assert_eq!(b.borrow().pulses, 1);
        assert_eq!(c.borrow().pulses, 0);
    }

    #[test]
    fn parse_returns_last_member_state() {
        let (mut group, _a, _b, _c) = group_of_three();
        assert_eq!(group.parse(100.0, true), 3);

        let empty = DecoderGroup::new().parse(100.0, true);
        assert_eq!(empty, 0);
    }

    #[test]
    fn membership_toggling() {
        let (mut group, a, _b, _c) = group_of_three();
        let a_handle: DecoderHandle = a.clone();

        assert!(group.is_active(&a_handle));
        group.set_active(&a_handle, false);
        assert!(!group.is_active(&a_handle));

        // No duplicate insertion when set twice.
        group.set_active(&a_handle, false);
        group.set_active(&a_handle, true);
        assert_eq!(group.len(), 3);

        group.parse(100.0, true);
        assert_eq!(a.borrow().pulses, 1);
    }

    #[test]
    fn set_active_inserts_non_members() {
        let mut group = DecoderGroup::new();
        let a = CountingDecoder::new(1);
        let a_handle: DecoderHandle = a.clone();
        group.set_active(&a_handle, true);

        group.parse(100.0, true);
        assert_eq!(a.borrow().pulses, 1);
        assert!(group.is_active(&a_handle));

        let b = CountingDecoder::new(2);
        let b_handle: DecoderHandle = b.clone();
        group.set_active(&b_handle, false);

        assert_eq!(group.len(), 2);
        assert!(!group.is_active(&b_handle));
    }

    #[test]
    fn remove_is_idempotent_false() {
        let (mut group, a, _b, _c) = group_of_three();
        let a_handle: DecoderHandle = a.clone();
        group.set_active(&a_handle, false);

        assert!(group.remove(&a_handle));
        assert!(!group.remove(&a_handle));
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn set_target_reaches_passive_members() {
        let (mut group, a, _b, c) = group_of_three();
        let c_handle: DecoderHandle = c.clone();
        group.set_active(&c_handle, false);

        let sink: SinkRef = Rc::new(RefCell::new(NullSink));
        group.set_target(sink);

        assert!(a.borrow().has_sink);
        assert!(c.borrow().has_sink);
    }

    #[test]
    fn decoders_lists_active_before_passive() {
        let (mut group, a, b, _c) = group_of_three();
        let a_handle: DecoderHandle = a.clone();
        group.set_active(&a_handle, false);

        let b_handle: DecoderHandle = b.clone();
        let all = group.decoders();
        assert_eq!(all.len(), 3);
        assert!(Rc::ptr_eq(&all[0], &b_handle));
        assert!(Rc::ptr_eq(&all[2], &a_handle));
    }
}
