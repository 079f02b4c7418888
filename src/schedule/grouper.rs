//! Splits a page's flat row stream into per-course blocks

use crate::schedule::{CourseBlock, RawRow};

/// Groups rows into blocks, each starting at a header row
///
/// Every row without a meeting track starts a new block and the meeting rows
/// after it belong to that block. Blocks with no meeting rows are dropped, as
/// are meeting rows that appear before the first header.
pub fn group_blocks<I>(rows: I) -> Vec<CourseBlock>
where
    I: IntoIterator<Item = RawRow>,
{
    let mut blocks = Vec::new();
    let mut current: Option<CourseBlock> = None;
    let mut orphans = 0usize;

    for row in rows {
        if row.origin.is_meeting() {
            match current.as_mut() {
                Some(block) => block.rows.push(row),
                None => orphans += 1,
            }
        } else {
            if let Some(block) = current.take() {
                push_if_schedulable(&mut blocks, block);
            }
            current = Some(CourseBlock {
                header: row,
                rows: Vec::new(),
            });
        }
    }

    if let Some(block) = current {
        push_if_schedulable(&mut blocks, block);
    }

    if orphans > 0 {
        tracing::debug!("Dropped {} meeting rows preceding the first header", orphans);
    }

    blocks
}

fn push_if_schedulable(blocks: &mut Vec<CourseBlock>, block: CourseBlock) {
    if block.rows.is_empty() {
        tracing::trace!("Dropping header-only block");
    } else {
        blocks.push(block);
    }
}
