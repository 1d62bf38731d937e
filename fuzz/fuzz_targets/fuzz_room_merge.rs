#![no_main]

use libfuzzer_sys::fuzz_target;
use ott_client::event_queue::{EventQueue, RoomEvent};
use ott_client::protocol::ServerMessage;
use ott_client::RoomSnapshot;

// Feed newline-separated messages through the snapshot merge and event queue.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut room = RoomSnapshot::default();
    let mut events = EventQueue::new();
    for line in text.lines() {
        match serde_json::from_str::<ServerMessage>(line) {
            Ok(ServerMessage::Sync(sync)) => {
                room = room.merged(sync);
                assert!(!room.extra.contains_key("action"));
            }
            Ok(ServerMessage::Event { event }) => {
                let before = events.len();
                events.push(RoomEvent::from_server(event));
                assert!(events.len() <= before + 1);
            }
            _ => {}
        }
    }
});
