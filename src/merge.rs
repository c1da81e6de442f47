// WHY: Matches from independent patterns overlap arbitrarily; this module turns them
// into one balanced open/close stream in a single left-to-right pass

use tracing::debug;

/// A half-open span `[start, end)` over one text block, in byte offsets.
///
/// `key` identifies what produced the match (a pattern slot or a per-boundary
/// style) and is handed back to the `MarkupWriter` untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub key: usize,
}

impl Match {
    pub fn new(start: usize, end: usize, key: usize) -> Self {
        Self { start, end, key }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One marker in the linearized stream. `index` refers into the match slice
/// given to `linearize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEvent {
    Open { position: usize, index: usize },
    Close { position: usize, index: usize },
}

impl MarkerEvent {
    pub fn position(&self) -> usize {
        match *self {
            MarkerEvent::Open { position, .. } | MarkerEvent::Close { position, .. } => position,
        }
    }

    pub fn index(&self) -> usize {
        match *self {
            MarkerEvent::Open { index, .. } | MarkerEvent::Close { index, .. } => index,
        }
    }
}

/// Emit policy driven by `render`. Text runs are always passed through in order,
/// so a writer only decides how tags look and how runs are formatted.
pub trait MarkupWriter {
    /// Text between two markers that does not end at a close tag
    fn text_run(&self, out: &mut String, run: &str) {
        out.push_str(run);
    }

    /// Text ending exactly where a close tag is about to be emitted
    fn closing_run(&self, out: &mut String, run: &str) {
        self.text_run(out, run);
    }

    fn open(&self, out: &mut String, m: &Match);

    fn close(&self, out: &mut String, m: &Match);
}

/// Order matches for opening: by start ascending, wider spans first on a shared
/// start so they can contain the narrower ones. The sort is stable, so matches
/// with identical spans stay in discovery order and the first discovered wins.
fn opening_order(matches: &[Match]) -> Vec<usize> {
    let mut starts: Vec<usize> = (0..matches.len()).collect();
    starts.sort_by(|&a, &b| {
        matches[a]
            .start
            .cmp(&matches[b].start)
            .then(matches[b].end.cmp(&matches[a].end))
    });
    starts
}

/// Linearize possibly overlapping matches into a balanced marker stream.
///
/// Rules, applied while walking matches in opening order:
/// 1. Every open match whose end is at or before the next start is closed first,
///    so adjacent spans never straddle each other.
/// 2. A match fully contained by the innermost open match nests inside it.
/// 3. A match that crosses the innermost open match's end, or repeats its exact
///    span, is suppressed: it contributes no markers and its text stays unmarked.
///
/// Marker positions are non-decreasing and every `Open` has exactly one later
/// `Close`. Matches must be non-empty and in bounds; that is the caller's job.
pub fn linearize(matches: &[Match]) -> Vec<MarkerEvent> {
    let mut events = Vec::with_capacity(matches.len() * 2);
    // WHY: open matches always nest, so the innermost (top) has the smallest end
    let mut open: Vec<usize> = Vec::new();

    for head_index in opening_order(matches) {
        let head = &matches[head_index];
        debug_assert!(!head.is_empty(), "zero-width match reached the merger: {head:?}");
        debug_assert!(head.start <= head.end);

        while let Some(&tail_index) = open.last() {
            let tail = &matches[tail_index];
            if tail.end > head.start {
                break;
            }
            events.push(MarkerEvent::Close { position: tail.end, index: tail_index });
            open.pop();
        }

        if let Some(&tail_index) = open.last() {
            let tail = &matches[tail_index];
            let crosses = head.end > tail.end;
            let repeats = head.start == tail.start && head.end == tail.end;
            if crosses || repeats {
                debug!(
                    "Suppressing overlapping match [{}, {}) key {} against [{}, {}) key {}",
                    head.start, head.end, head.key, tail.start, tail.end, tail.key
                );
                continue;
            }
        }

        events.push(MarkerEvent::Open { position: head.start, index: head_index });
        open.push(head_index);
    }

    while let Some(tail_index) = open.pop() {
        events.push(MarkerEvent::Close {
            position: matches[tail_index].end,
            index: tail_index,
        });
    }

    events
}

/// Interleave text and markers into one markup string
pub fn render<W: MarkupWriter>(
    text: &str,
    matches: &[Match],
    events: &[MarkerEvent],
    writer: &W,
) -> String {
    let mut out = String::with_capacity(text.len() + events.len() * 16);
    let mut index = 0;

    for event in events {
        let position = event.position();
        debug_assert!(position >= index && position <= text.len());
        let run = &text[index..position];
        index = position;

        let m = &matches[event.index()];
        match event {
            MarkerEvent::Open { .. } => {
                writer.text_run(&mut out, run);
                writer.open(&mut out, m);
            }
            MarkerEvent::Close { .. } => {
                writer.closing_run(&mut out, run);
                writer.close(&mut out, m);
            }
        }
    }

    writer.text_run(&mut out, &text[index..]);
    out
}

/// Merge matches over `text` into balanced markup. An empty match list returns
/// the text unchanged.
pub fn merge<W: MarkupWriter>(text: &str, matches: &[Match], writer: &W) -> String {
    if matches.is_empty() {
        return text.to_string();
    }
    let events = linearize(matches);
    render(text, matches, &events, writer)
}
