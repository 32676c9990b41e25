use crate::error::Result;
use crate::io::{FastaReader, FastaSink, SequenceSink};
use crate::model::SequenceKind;

#[derive(Default)]
struct Events {
    headers: Vec<(String, String)>,
    bodies: Vec<String>,
    empty_lines: usize,
}

impl FastaSink for Events {
    fn new_sequence(&mut self, name: &str, description: &str) -> Result<()> {
        self.headers.push((name.to_string(), description.to_string()));
        self.bodies.push(String::new());
        Ok(())
    }

    fn grow_sequence(&mut self, letters: &str) -> Result<()> {
        self.bodies.last_mut().unwrap().push_str(letters);
        Ok(())
    }

    fn empty_line_found(&mut self) {
        self.empty_lines += 1;
    }
}

#[test]
fn header_splits_name_and_description() {
    let input = b">s1 some description here\nATGC\n>s2\nTT GG\ncc\n" as &[u8];
    let mut reader = FastaReader::new(input);
    let mut events = Events::default();
    assert!(reader.read_all_sequences(&mut events).unwrap());
    assert_eq!(
        events.headers,
        vec![
            ("s1".to_string(), "some description here".to_string()),
            ("s2".to_string(), String::new()),
        ]
    );
    // Whitespace inside body lines is stripped, lines are concatenated.
    assert_eq!(events.bodies, vec!["ATGC".to_string(), "TTGGcc".to_string()]);
}

#[test]
fn read_one_sequence_stops_at_the_next_header() {
    let input = b">a\nAT\n>b\nGC\n" as &[u8];
    let mut reader = FastaReader::new(input);
    let mut events = Events::default();
    assert!(reader.read_one_sequence(&mut events).unwrap());
    assert_eq!(events.headers.len(), 1);
    assert!(reader.read_one_sequence(&mut events).unwrap());
    assert_eq!(events.headers.len(), 2);
    assert!(!reader.read_one_sequence(&mut events).unwrap());
}

#[test]
fn read_until_empty_line_reports_the_break() {
    let input = b">a\nAT\n\n>b\nGC\n" as &[u8];
    let mut reader = FastaReader::new(input);
    let mut events = Events::default();
    assert!(reader.read_until_empty_line(&mut events).unwrap());
    assert_eq!(events.headers.len(), 1);
    assert_eq!(events.empty_lines, 1);
    assert!(reader.read_until_empty_line(&mut events).unwrap());
    assert_eq!(events.headers.len(), 2);
    assert!(!reader.read_until_empty_line(&mut events).unwrap());
}

#[test]
fn sequence_sink_normalizes_letters() {
    let input = b">s1 genome\natg-c\nxyzn\n" as &[u8];
    let mut reader = FastaReader::new(input);
    let mut sink = SequenceSink::new(SequenceKind::AsIs);
    reader.read_all_sequences(&mut sink).unwrap();
    assert_eq!(sink.sequences.len(), 1);
    let sequence = &sink.sequences[0];
    assert_eq!(sequence.name(), "s1");
    assert_eq!(sequence.description(), "genome");
    assert_eq!(sequence.contents(), b"ATGNCNNNN");
}
