use attacca_domain_midi::ChannelEvent;
use attacca_ports::types::Tick;

/// Walks a tick-sorted event list, handing out the slice of events that
/// falls inside each successive render window.
#[derive(Clone, Debug, Default)]
pub struct ScoreCursor {
    events: Vec<ChannelEvent>,
    cursor: usize,
}

impl ScoreCursor {
    pub fn new(mut events: Vec<ChannelEvent>) -> Self {
        events.sort_by_key(|event| event.tick);
        Self { events, cursor: 0 }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn seek(&mut self, tick: Tick) {
        self.cursor = self
            .events
            .iter()
            .position(|event| event.tick >= tick)
            .unwrap_or(self.events.len());
    }

    /// Events with `tick <= end_tick` that have not been emitted yet.
    pub fn take_window(&mut self, end_tick: Tick) -> &[ChannelEvent] {
        let start = self.cursor;
        while let Some(event) = self.events.get(self.cursor) {
            if event.tick > end_tick {
                break;
            }
            self.cursor += 1;
        }
        &self.events[start..self.cursor]
    }

    pub fn exhausted(&self) -> bool {
        self.cursor >= self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
