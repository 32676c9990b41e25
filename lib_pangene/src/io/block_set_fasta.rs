use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::Arc;

use log::debug;

use crate::error::{Error, Result};
use crate::io::{extract_value, FastaReader, FastaSink};
use crate::model::{
    AlignmentRow, Block, BlockSet, Fragment, Ori, RowKind, Sequence, SequenceKind, SetFc,
};
use crate::nucleotide::{reverse_complement, to_atgcn, GAP};


// One staged fasta record.
enum Record {
    WholeSequence {
        sets: Vec<String>,
        name: String,
        description: String,
        letters: Vec<u8>,
    },
    FragmentEntry {
        sets: Vec<String>,
        block_name: String,
        id: String,
        keep_row: bool,
        row_string: Vec<u8>,
    },
}

/// Reader of the block-set fasta format.
///
/// Fragment records are named `<seq>_<begin>_<last>` and carry `key=value`
/// pairs in the description: `block=<name>` names the block, `set=<name>`
/// (comma-separated, or `all`) routes the record to block sets, and a
/// `norow` token keeps the fragment bare of an alignment row. Records named
/// otherwise introduce whole sequences.
///
/// Sequences not seen before are reconstructed from the fragment letters,
/// reverse-complemented for fragments read backwards; positions no
/// fragment covers read as `N`.
pub struct BlockSetFastaReader {
    row_kind: RowKind,
    seq_kind: SequenceKind,
    unknown_bs_allowed: bool,
    sets: BTreeMap<String, BlockSet>,
    records: Vec<Record>,
}

impl BlockSetFastaReader {
    /// A reader with one empty `target` block set.
    pub fn new(row_kind: RowKind, seq_kind: SequenceKind) -> Self {
        let mut sets = BTreeMap::new();
        sets.insert("target".to_string(), BlockSet::new());
        Self {
            row_kind,
            seq_kind,
            unknown_bs_allowed: true,
            sets,
            records: Vec::new(),
        }
    }

    /// Registers (or replaces) a named block set; its sequences are reused
    /// by fragments referencing them.
    pub fn set_block_set(&mut self, name: impl Into<String>, block_set: BlockSet) {
        self.sets.insert(name.into(), block_set);
    }

    /// Whether `set=` values naming unregistered block sets are skipped
    /// (the default) or rejected.
    pub fn set_unknown_bs_allowed(&mut self, allowed: bool) {
        self.unknown_bs_allowed = allowed;
    }

    pub fn block_set(&self, name: &str) -> Option<&BlockSet> {
        self.sets.get(name)
    }

    pub fn take_block_set(&mut self, name: &str) -> Option<BlockSet> {
        self.sets.remove(name)
    }

    /// Reads every record of `input` and applies them to the registered
    /// block sets.
    pub fn read(&mut self, input: impl BufRead) -> Result<()> {
        let mut reader = FastaReader::new(input);
        let mut sink = RecordSink {
            reader: self,
            current: false,
        };
        reader.read_all_sequences(&mut sink)?;
        self.finish()
    }

    fn route(&self, description: &str) -> Result<Vec<String>> {
        let set_names = extract_value(description, "set").unwrap_or("target");
        if set_names == "all" {
            return Ok(self.sets.keys().cloned().collect());
        }
        let mut routed = Vec::new();
        for name in set_names.split(',') {
            if self.sets.contains_key(name) {
                routed.push(name.to_string());
            } else if !self.unknown_bs_allowed {
                return Err(Error::malformed("block set reference", name));
            }
        }
        Ok(routed)
    }

    fn stage_header(&mut self, name: &str, description: &str) -> Result<()> {
        let sets = self.route(description)?;
        let block_name = extract_value(description, "block");
        let record = match block_name {
            Some(block_name) => {
                if Fragment::seq_name_from_id(name).is_none() {
                    return Err(Error::malformed("fragment id", name));
                }
                let keep_row = !description.split_whitespace().any(|token| token == "norow");
                Record::FragmentEntry {
                    sets,
                    block_name: block_name.to_string(),
                    id: name.to_string(),
                    keep_row,
                    row_string: Vec::new(),
                }
            }
            None => Record::WholeSequence {
                sets,
                name: name.to_string(),
                description: description.to_string(),
                letters: Vec::new(),
            },
        };
        self.records.push(record);
        Ok(())
    }

    fn stage_body(&mut self, letters: &str) {
        match self.records.last_mut() {
            Some(Record::WholeSequence { letters: buffer, .. }) => {
                buffer.extend_from_slice(&to_atgcn(letters.as_bytes()));
            }
            Some(Record::FragmentEntry { row_string, .. }) => {
                row_string.extend_from_slice(letters.as_bytes());
            }
            None => {}
        }
    }

    // Coordinates parsed from a staged fragment id.
    fn parse_id(id: &str) -> Result<(String, usize, usize, Ori)> {
        let bad = || Error::malformed("fragment id", id);
        let seq_name = Fragment::seq_name_from_id(id).ok_or_else(bad)?;
        let mut numbers = id[seq_name.len() + 1..].split('_');
        let begin: usize = numbers.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let last: usize = numbers.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        if begin <= last {
            Ok((seq_name.to_string(), begin, last, Ori::Forward))
        } else {
            Ok((seq_name.to_string(), last, begin, Ori::Reverse))
        }
    }

    // Plain letters of a staged fragment record, in sequence direction.
    fn fragment_letters(row_string: &[u8], ori: Ori) -> Vec<u8> {
        let letters: Vec<u8> = row_string.iter().copied().filter(|&c| c != GAP).collect();
        let letters = to_atgcn(&letters);
        match ori {
            Ori::Forward => letters,
            Ori::Reverse => reverse_complement(&letters),
        }
    }

    // Whether any of the record's routed sets already registers the
    // sequence. Only the routed sets count: a sequence known elsewhere is
    // still reconstructed for the sets the record goes to.
    fn known_in_routed(&self, routed: &[String], seq_name: &str) -> bool {
        routed
            .iter()
            .filter_map(|set_name| self.sets.get(set_name))
            .any(|set| set.seq_from_name(seq_name).is_some())
    }

    fn finish(&mut self) -> Result<()> {
        let records = std::mem::take(&mut self.records);
        // Assemble the letter buffers of sequences the input introduces
        // itself, filling each from the fragments that cover it.
        let mut buffers: BTreeMap<String, Sequence> = BTreeMap::new();
        for record in &records {
            match record {
                Record::WholeSequence {
                    name,
                    description,
                    letters,
                    ..
                } => {
                    let mut sequence = Sequence::new(self.seq_kind);
                    sequence.set_name(name.clone());
                    sequence.set_description(description.clone());
                    sequence.map_from_slice(0, letters);
                    buffers.insert(name.clone(), sequence);
                }
                Record::FragmentEntry {
                    sets,
                    id,
                    row_string,
                    ..
                } => {
                    let (seq_name, min_pos, _, ori) = Self::parse_id(id)?;
                    if self.known_in_routed(sets, &seq_name) {
                        continue;
                    }
                    let sequence = buffers.entry(seq_name.clone()).or_insert_with(|| {
                        let mut sequence = Sequence::new(self.seq_kind);
                        sequence.set_name(seq_name.clone());
                        sequence
                    });
                    sequence.map_from_slice(min_pos, &Self::fragment_letters(row_string, ori));
                }
            }
        }
        let built: BTreeMap<String, Arc<Sequence>> = buffers
            .into_iter()
            .map(|(name, sequence)| (name, Arc::new(sequence)))
            .collect();
        debug!(
            "block set fasta: {} records, {} new sequences",
            records.len(),
            built.len()
        );
        // Apply records to the routed block sets.
        for record in &records {
            match record {
                Record::WholeSequence { sets, name, .. } => {
                    let sequence = built[name].clone();
                    for set_name in sets {
                        if let Some(set) = self.sets.get_mut(set_name) {
                            set.add_sequence(sequence.clone());
                        }
                    }
                }
                Record::FragmentEntry {
                    sets,
                    block_name,
                    id,
                    keep_row,
                    row_string,
                } => {
                    let (seq_name, min_pos, max_pos, ori) = Self::parse_id(id)?;
                    // Resolve the sequence once per record: the first routed
                    // set that registers it wins, then the reconstructed
                    // ones. Every routed set shares the resolved sequence.
                    let sequence = sets
                        .iter()
                        .filter_map(|set_name| self.sets.get(set_name))
                        .find_map(|set| set.seq_from_name(&seq_name))
                        .or_else(|| built.get(&seq_name))
                        .ok_or_else(|| Error::malformed("fragment id", id.clone()))?
                        .clone();
                    if max_pos >= sequence.size() {
                        return Err(Error::malformed(
                            "fragment id",
                            format!("{id}: position beyond the sequence"),
                        ));
                    }
                    for set_name in sets {
                        let Some(set) = self.sets.get_mut(set_name) else {
                            continue;
                        };
                        set.add_sequence(sequence.clone());
                        let mut fragment =
                            Fragment::new(sequence.clone(), min_pos, max_pos, ori);
                        if *keep_row && !row_string.is_empty() {
                            let row =
                                AlignmentRow::from_alignment_string(self.row_kind, row_string);
                            if row.bound() != fragment.length() {
                                return Err(Error::malformed(
                                    "alignment row",
                                    format!("{id}: row does not cover the fragment"),
                                ));
                            }
                            fragment.set_row(row);
                        }
                        let block_id = set
                            .blocks()
                            .find(|(_, block)| block.name() == block_name.as_str())
                            .map(|(block_id, _)| block_id);
                        match block_id {
                            Some(block_id) => set.block_mut(block_id).insert(fragment),
                            None => {
                                let mut block = Block::with_name(block_name.clone());
                                block.insert(fragment);
                                set.insert(block);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

struct RecordSink<'a> {
    reader: &'a mut BlockSetFastaReader,
    current: bool,
}

impl FastaSink for RecordSink<'_> {
    fn new_sequence(&mut self, name: &str, description: &str) -> Result<()> {
        self.current = true;
        self.reader.stage_header(name, description)
    }

    fn grow_sequence(&mut self, letters: &str) -> Result<()> {
        if self.current {
            self.reader.stage_body(letters);
        }
        Ok(())
    }
}

/// Writes one fasta record; `line` wraps the text at that width, `0` keeps
/// it on one line.
pub fn write_fasta(
    out: &mut impl Write,
    name: &str,
    description: &str,
    text: &[u8],
    line: usize,
) -> Result<()> {
    write!(out, ">{name}")?;
    if !description.is_empty() {
        write!(out, " {description}")?;
    }
    writeln!(out)?;
    if line == 0 {
        out.write_all(text)?;
        writeln!(out)?;
    } else {
        for chunk in text.chunks(line) {
            out.write_all(chunk)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Writes every block of the set: blocks ordered by descending size then
/// name, fragments by id; each fragment's description records its block
/// and its neighbours on the sequence.
pub fn write_block_set_fasta(
    out: &mut impl Write,
    block_set: &BlockSet,
    line: usize,
) -> Result<()> {
    let mut index = SetFc::new();
    index.add_bs(block_set);
    let mut blocks: Vec<_> = block_set.blocks().collect();
    blocks.sort_by_key(|(id, block)| {
        (
            std::cmp::Reverse(block.size()),
            block.name().to_string(),
            *id,
        )
    });
    for (_, block) in blocks {
        let mut fragments: Vec<&Fragment> = block.fragments().collect();
        fragments.sort_by_key(|fragment| fragment.id());
        for fragment in fragments {
            let mut description = format!("block={}", block.name());
            if let Some(prev) = index.prev(fragment) {
                let neighbor = Fragment::new(
                    fragment.seq().clone(),
                    prev.min_pos,
                    prev.max_pos,
                    prev.ori,
                );
                description.push_str(&format!(" prev={}", neighbor.id()));
            }
            if let Some(next) = index.next(fragment) {
                let neighbor = Fragment::new(
                    fragment.seq().clone(),
                    next.min_pos,
                    next.max_pos,
                    next.ori,
                );
                description.push_str(&format!(" next={}", neighbor.id()));
            }
            if fragment.row().is_none() {
                description.push_str(" norow");
            }
            write_fasta(
                out,
                &fragment.id(),
                &description,
                &fragment.alignment_string(),
                line,
            )?;
        }
    }
    Ok(())
}
