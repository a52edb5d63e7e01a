// Recorded command history and the two ways of walking it.
//
// A forward run pulls command indices from a `Recorder`, which draws each
// index from the entropy source and remembers the byte offset it was drawn
// at. Shrinking walks a slice of that history with a `Replayer`, which seeks
// back to every recorded offset and draws the index again. Replay never adds
// to the history.

use crate::entropy::Random;
use crate::error::Result;

/// One recorded draw: where in the buffer it happened and what it picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    pub offset: usize,
    pub index: usize,
}

/// Command history of one forward run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandList {
    entries: Vec<Entry>,
}

impl CommandList {
    pub fn new() -> CommandList {
        CommandList::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Command indices in recorded order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|entry| entry.index)
    }

    fn push(&mut self, entry: Entry) -> Result<()> {
        self.entries.try_reserve(1)?;
        self.entries.push(entry);
        Ok(())
    }
}

/// Draws command indices on demand and records them.
///
/// Stops after `max_steps` draws, or cleanly when the buffer is exactly used
/// up between two draws. A draw that runs out part way yields an error, after
/// which the recorder is exhausted.
#[derive(Debug)]
pub struct Recorder<'l, 's, 'a> {
    random: Random<'s, 'a>,
    list: &'l mut CommandList,
    command_count: usize,
    max_steps: usize,
    steps: usize,
    done: bool,
}

impl<'l, 's, 'a> Recorder<'l, 's, 'a> {
    pub fn new(
        random: Random<'s, 'a>,
        list: &'l mut CommandList,
        command_count: usize,
        max_steps: usize,
    ) -> Recorder<'l, 's, 'a> {
        assert!(command_count > 0, "cannot draw from an empty command set");
        Recorder {
            random,
            list,
            command_count,
            max_steps,
            steps: 0,
            done: false,
        }
    }

    fn draw(&mut self) -> Result<usize> {
        let offset = self.random.position();
        let index = self.random.index(self.command_count)?;
        self.list.push(Entry { offset, index })?;
        self.steps += 1;
        Ok(index)
    }
}

impl<'l, 's, 'a> Iterator for Recorder<'l, 's, 'a> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Result<usize>> {
        if self.done || self.steps >= self.max_steps || self.random.remaining() == 0 {
            return None;
        }
        let drawn = self.draw();
        if drawn.is_err() {
            self.done = true;
        }
        Some(drawn)
    }
}

/// Re-draws recorded command indices from their offsets.
#[derive(Debug)]
pub struct Replayer<'l, 's, 'a> {
    random: Random<'s, 'a>,
    entries: std::slice::Iter<'l, Entry>,
    command_count: usize,
}

impl<'l, 's, 'a> Replayer<'l, 's, 'a> {
    pub fn new(random: Random<'s, 'a>, entries: &'l [Entry], command_count: usize) -> Replayer<'l, 's, 'a> {
        Replayer {
            random,
            entries: entries.iter(),
            command_count,
        }
    }
}

impl<'l, 's, 'a> Iterator for Replayer<'l, 's, 'a> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Result<usize>> {
        let entry = self.entries.next()?;
        self.random.seek(entry.offset);
        Some(self.random.index(self.command_count).map(|index| {
            debug_assert_eq!(index, entry.index, "replay drew a different command at {}", entry.offset);
            log::trace!("replayed command {} from offset {}", index, entry.offset);
            index
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::Entropy;
    use crate::error::Error;

    #[test]
    fn test_recorder_records_offsets() {
        // Three commands: index(3) draws one byte each, 0 is rejected.
        let bytes = [1, 0, 100, 200];
        let mut entropy = Entropy::new(&bytes);
        let mut list = CommandList::new();
        let drawn: Vec<usize> = Recorder::new(entropy.random(), &mut list, 3, 10)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(drawn, vec![0, 1, 2]);
        assert_eq!(
            list.entries(),
            &[
                Entry { offset: 0, index: 0 },
                Entry { offset: 1, index: 1 },
                Entry { offset: 3, index: 2 },
            ]
        );
    }

    #[test]
    fn test_recorder_stops_at_max_steps() {
        let bytes = [50u8; 16];
        let mut entropy = Entropy::new(&bytes);
        let mut list = CommandList::new();
        let count = Recorder::new(entropy.random(), &mut list, 2, 5).count();
        assert_eq!(count, 5);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn test_recorder_partial_draw_is_an_error() {
        // 300 commands need two bytes per draw.
        let bytes = [1, 0, 7];
        let mut entropy = Entropy::new(&bytes);
        let mut list = CommandList::new();
        let drawn: Vec<Result<usize>> = Recorder::new(entropy.random(), &mut list, 300, 10).collect();
        assert_eq!(drawn.len(), 2);
        assert!(drawn[0].is_ok());
        assert_eq!(
            drawn[1],
            Err(Error::OutOfEntropy {
                needed: 2,
                remaining: 1
            })
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_replayer_redraws_without_recording() {
        let bytes = [1, 0, 100, 200, 170];
        let mut entropy = Entropy::new(&bytes);
        let mut list = CommandList::new();
        Recorder::new(entropy.random(), &mut list, 3, 10)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let recorded = list.clone();

        let replayed: Vec<usize> = Replayer::new(entropy.random(), &list.entries()[2..], 3)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(replayed, vec![2, 1]);
        assert_eq!(list, recorded);
        assert_eq!(list.indices().collect::<Vec<_>>(), vec![0, 1, 2, 1]);
    }
}
