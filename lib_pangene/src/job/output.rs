use std::io::Write;

use generic_thread_group::{perform, Job};

use crate::error::{Error, Result};
use crate::model::{BlockId, BlockSet};

/// Per-block text generation for output processors.
///
/// Rendering runs in parallel; the rendered chunks are written in the
/// deterministic block order, header first.
pub trait PrintBlock: Sync {
    /// Writes the header preceding all blocks. Nothing by default.
    fn print_header(&self, _out: &mut dyn Write, _block_set: &BlockSet) -> Result<()> {
        Ok(())
    }

    /// Writes the text of one block.
    fn print_block(&self, out: &mut dyn Write, block_set: &BlockSet, id: BlockId) -> Result<()>;

    /// Block order of the output; the default sorts by descending size,
    /// then name.
    fn change_blocks(&self, block_set: &BlockSet, blocks: &mut Vec<BlockId>) -> Result<()> {
        blocks.sort_by_key(|&id| {
            let block = block_set.block(id);
            (
                std::cmp::Reverse(block.size()),
                block.name().to_string(),
                id,
            )
        });
        Ok(())
    }
}

struct Renderer<'a, P> {
    printer: &'a P,
    block_set: &'a BlockSet,
    blocks: &'a [BlockId],
}

impl<P: PrintBlock> Job for Renderer<'_, P> {
    type Task = usize;
    type WorkerData = Vec<(usize, Vec<u8>)>;
    type Error = Error;

    fn before_thread(&self, _worker: usize) -> Self::WorkerData {
        Vec::new()
    }

    fn process(&self, task: &usize, data: &mut Self::WorkerData) -> Result<()> {
        let mut text = Vec::new();
        self.printer
            .print_block(&mut text, self.block_set, self.blocks[*task])?;
        data.push((*task, text));
        Ok(())
    }
}

/// Renders every block with `printer` on `workers` threads and writes the
/// chunks to `out` in block order.
pub fn print_blocks<P: PrintBlock>(
    printer: &P,
    block_set: &BlockSet,
    out: &mut impl Write,
    workers: usize,
) -> Result<()> {
    let mut blocks = block_set.block_ids();
    printer.change_blocks(block_set, &mut blocks)?;
    printer.print_header(out, block_set)?;
    let outcome = perform(
        &Renderer {
            printer,
            block_set,
            blocks: &blocks,
        },
        &(0..blocks.len()).collect::<Vec<usize>>(),
        workers.max(1),
    );
    let mut chunks: Vec<(usize, Vec<u8>)> = outcome.worker_data.into_iter().flatten().collect();
    if let Some(error) = outcome.error {
        return Err(error);
    }
    chunks.sort_by_key(|&(position, _)| position);
    for (_, text) in chunks {
        out.write_all(&text)?;
    }
    Ok(())
}
