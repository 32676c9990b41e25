use std::io::BufRead;

use crate::error::Result;
use crate::model::{Sequence, SequenceKind};
use crate::nucleotide::to_atgcn;

#[cfg(test)]
mod tests;

/// Receiver of fasta events.
///
/// Body lines arrive whitespace-stripped but otherwise raw, so sinks that
/// build alignment rows keep their gap characters; sequence-building sinks
/// normalize with [`to_atgcn`].
pub trait FastaSink {
    /// A `>` header: the name runs to the first whitespace, the rest is the
    /// description.
    fn new_sequence(&mut self, name: &str, description: &str) -> Result<()>;

    /// One body line, whitespace stripped.
    fn grow_sequence(&mut self, letters: &str) -> Result<()>;

    /// An empty line between records.
    fn empty_line_found(&mut self) {}
}

/// A streaming fasta parser over a buffered reader.
pub struct FastaReader<R> {
    input: R,
    // One line of lookahead, set when a header ends the previous record.
    peeked: Option<String>,
    found_empty_line: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            peeked: None,
            found_empty_line: false,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.peeked.take() {
            return Ok(Some(line));
        }
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn parse_header(line: &str) -> (&str, &str) {
        let header = &line[1..];
        match header.split_once(char::is_whitespace) {
            Some((name, description)) => (name, description.trim_start()),
            None => (header, ""),
        }
    }

    /// Reads one record into `sink`. Returns whether a record was seen.
    pub fn read_one_sequence(&mut self, sink: &mut impl FastaSink) -> Result<bool> {
        let mut in_sequence = false;
        while let Some(line) = self.next_line()? {
            if line.is_empty() {
                sink.empty_line_found();
                self.found_empty_line = true;
            } else if line.starts_with('>') {
                if in_sequence {
                    // The next record starts here; keep its header.
                    self.peeked = Some(line);
                    return Ok(true);
                }
                in_sequence = true;
                let (name, description) = Self::parse_header(&line);
                sink.new_sequence(name, description)?;
            } else if in_sequence {
                let stripped: String = line.split_whitespace().collect();
                sink.grow_sequence(&stripped)?;
            }
        }
        Ok(in_sequence)
    }

    /// Reads records until an empty line or the end of input. Returns
    /// whether any record was seen.
    pub fn read_until_empty_line(&mut self, sink: &mut impl FastaSink) -> Result<bool> {
        let mut result = false;
        loop {
            self.found_empty_line = false;
            let ok = self.read_one_sequence(sink)?;
            result |= ok;
            if self.found_empty_line || !ok {
                break;
            }
        }
        Ok(result)
    }

    /// Reads every record of the input. Returns whether any was seen.
    pub fn read_all_sequences(&mut self, sink: &mut impl FastaSink) -> Result<bool> {
        let mut result = false;
        while self.read_one_sequence(sink)? {
            result = true;
        }
        Ok(result)
    }
}

/// A sink collecting plain sequences: letters are upper-cased and folded to
/// `ATGCN`.
#[derive(Debug, Default)]
pub struct SequenceSink {
    kind: Option<SequenceKind>,
    pub sequences: Vec<Sequence>,
}

impl SequenceSink {
    pub fn new(kind: SequenceKind) -> Self {
        Self {
            kind: Some(kind),
            sequences: Vec::new(),
        }
    }

    fn kind(&self) -> SequenceKind {
        self.kind.unwrap_or(SequenceKind::AsIs)
    }
}

impl FastaSink for SequenceSink {
    fn new_sequence(&mut self, name: &str, description: &str) -> Result<()> {
        let mut sequence = Sequence::new(self.kind());
        sequence.set_name(name);
        sequence.set_description(description);
        self.sequences.push(sequence);
        Ok(())
    }

    fn grow_sequence(&mut self, letters: &str) -> Result<()> {
        if let Some(sequence) = self.sequences.last_mut() {
            sequence.push_back(&to_atgcn(letters.as_bytes()));
        }
        Ok(())
    }
}
