//! Poll responder
//!
//! Answers the master's `ping` and `send` on behalf of a node that keeps its
//! outgoing traffic in an [`Outbox`].

use hausbus_hal::TxTrigger;
use hausbus_protocol::address::MASTER;
use hausbus_protocol::{Frame, PollMessage};

use crate::engine::Bus;
use crate::outbox::Outbox;
use crate::transmit::SendError;

/// Answer a poll message addressed to `own_address`
///
/// Returns the poll message that was handled, or `None` if the frame is not
/// a poll from the master to this node. On `send` the oldest frame leaves the outbox only
/// once the transmit engine took it; a `Busy` engine keeps it queued for the
/// next poll.
pub fn respond_to_poll<const N: usize, const DEPTH: usize, K: TxTrigger>(
    bus: &mut Bus<'_, N, K>,
    outbox: &mut Outbox<DEPTH>,
    frame: &Frame<'_>,
    own_address: u8,
) -> Result<Option<PollMessage>, SendError> {
    if frame.destination() != own_address || frame.source() != MASTER {
        return Ok(None);
    }

    let Some(message) = PollMessage::from_frame(frame) else {
        return Ok(None);
    };

    match message {
        PollMessage::Ping => {
            let pending = outbox.pending();
            let pong = PollMessage::Pong { pending }.to_payload();
            bus.send(frame.source(), own_address, &pong)?;
            bus_trace!("pong to {}, {} pending", frame.source(), pending);
        }
        PollMessage::Send => {
            if let Some(queued) = outbox.front() {
                bus.send_frame(queued)?;
                outbox.pop();
            }
        }
        PollMessage::Pong { .. } => return Ok(None),
    }

    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::engine::BusEngine;
    use hausbus_hal::mock::MockBus;
    use hausbus_hal::{TxEvent, TxInterrupt};
    use hausbus_protocol::encode_to_vec;

    #[test]
    fn test_ping_answered_with_pending_count() {
        let hw = MockBus::new();
        let mut engine = BusEngine::<64>::new();
        let (mut bus, _receiver, _pump) = engine.split(
            NodeConfig::new(3),
            hw.uart(),
            hw.uart(),
            hw.pin(),
            hw.trigger(),
        );
        let mut outbox = Outbox::<4>::new();
        outbox.enqueue(50, 3, b"KEY 5").unwrap();

        let ping = encode_to_vec(3, 0, b"ping").unwrap();
        let frame = Frame::parse(&ping).unwrap();

        assert_eq!(
            respond_to_poll(&mut bus, &mut outbox, &frame, 3),
            Ok(Some(PollMessage::Ping))
        );
        assert!(bus.is_transmitting());
        assert_eq!(outbox.pending(), 1);
    }

    #[test]
    fn test_send_pops_only_after_accepted() {
        let hw = MockBus::new();
        let mut engine = BusEngine::<64>::new();
        let (mut bus, _receiver, mut pump) = engine.split(
            NodeConfig::new(3),
            hw.uart(),
            hw.uart(),
            hw.pin(),
            hw.trigger(),
        );
        let mut outbox = Outbox::<4>::new();
        outbox.enqueue(50, 3, b"KEY 5").unwrap();
        bus.send(0, 3, b"busy").unwrap();

        let send = encode_to_vec(3, 0, b"send").unwrap();
        let frame = Frame::parse(&send).unwrap();
        assert_eq!(
            respond_to_poll(&mut bus, &mut outbox, &frame, 3),
            Err(SendError::Busy)
        );
        assert_eq!(outbox.pending(), 1);

        pump.on_event(TxEvent::Kick);
        while hw.is_listening(TxInterrupt::BufferEmpty) {
            pump.on_event(TxEvent::BufferEmpty);
        }
        pump.on_event(TxEvent::Complete);
        hw.clear_written();

        assert_eq!(
            respond_to_poll(&mut bus, &mut outbox, &frame, 3),
            Ok(Some(PollMessage::Send))
        );
        assert_eq!(outbox.pending(), 0);
    }

    #[test]
    fn test_other_frames_ignored() {
        let hw = MockBus::new();
        let mut engine = BusEngine::<64>::new();
        let (mut bus, _receiver, _pump) = engine.split(
            NodeConfig::new(3),
            hw.uart(),
            hw.uart(),
            hw.pin(),
            hw.trigger(),
        );
        let mut outbox = Outbox::<4>::new();

        let for_other = encode_to_vec(4, 0, b"ping").unwrap();
        let not_poll = encode_to_vec(3, 0, b"open").unwrap();
        for raw in [&for_other, &not_poll] {
            let frame = Frame::parse(raw).unwrap();
            assert_eq!(respond_to_poll(&mut bus, &mut outbox, &frame, 3), Ok(None));
        }
        assert!(!bus.is_transmitting());
    }

    #[test]
    fn test_polls_from_other_nodes_ignored() {
        let hw = MockBus::new();
        let mut engine = BusEngine::<64>::new();
        let (mut bus, _receiver, _pump) = engine.split(
            NodeConfig::new(3),
            hw.uart(),
            hw.uart(),
            hw.pin(),
            hw.trigger(),
        );
        let mut outbox = Outbox::<4>::new();
        outbox.enqueue(50, 3, b"KEY 5").unwrap();

        let send = encode_to_vec(3, 7, b"send").unwrap();
        let ping = encode_to_vec(3, 7, b"ping").unwrap();
        for raw in [&send, &ping] {
            let frame = Frame::parse(raw).unwrap();
            assert_eq!(respond_to_poll(&mut bus, &mut outbox, &frame, 3), Ok(None));
        }
        assert!(!bus.is_transmitting());
        assert_eq!(outbox.pending(), 1);
        assert_eq!(hw.triggers(), 0);
    }
}
