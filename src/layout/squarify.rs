use super::block::{BlockId, BlockTreeBuilder};
use super::rect::{finite_or_zero, Rect};
use crate::tree::arena::{EntityId, EntityTree};

/// Squarified packing (Bruls, Huizing, van Wijk) of `children` into `rect`,
/// using revision-0 weights. Returns the root container block.
///
/// Children with zero weight at revision 0 get no block. The rest are sorted
/// by weight (descending, stable) and greedily batched into rows: a row grows
/// while adding the next entity does not worsen its worst aspect ratio. Each
/// closed row becomes a chain of blocks hanging off a container's `central`,
/// and a fresh container for the leftover space is linked to the `right`
/// (vertical cut) or `bottom` (horizontal cut). The last container never holds
/// a row and stays a zero-weight leaf.
pub fn pack(
    entities: &EntityTree,
    children: &[EntityId],
    rect: Rect,
    builder: &mut BlockTreeBuilder,
) -> BlockId {
    let mut items: Vec<(EntityId, f64)> = children
        .iter()
        .map(|&id| (id, entities.weight(id, 0)))
        .filter(|&(_, w)| w > 0.0)
        .collect();
    items.sort_by(|a, b| b.1.total_cmp(&a.1));

    // Normalized weights sum to the rectangle's area
    let total: f64 = items.iter().map(|&(_, w)| w).sum();
    let normalizer = finite_or_zero(rect.area() / total);
    for item in &mut items {
        item.1 *= normalizer;
    }

    let root = builder.add(None, rect);
    let mut outside = root;
    let mut remaining = rect;
    let mut row_start = 0;

    for next in 0..items.len() {
        let row = &items[row_start..next];
        let row_weights: Vec<f64> = row.iter().map(|&(_, w)| w).collect();
        if !improves_ratio(&row_weights, items[next].1, remaining.short_edge()) {
            outside = close_row(builder, outside, &mut remaining, row);
            row_start = next;
        }
    }
    if row_start < items.len() {
        close_row(builder, outside, &mut remaining, &items[row_start..]);
    }

    root
}

/// Would adding `candidate` to `row` keep (or improve) the row's worst aspect
/// ratio, given the row's perpendicular side `length`? An empty row always accepts.
pub fn improves_ratio(row: &[f64], candidate: f64, length: f64) -> bool {
    if row.is_empty() {
        return true;
    }

    let (mut min_current, mut max_current, mut sum_current) = (f64::MAX, f64::MIN, 0.0);
    for &w in row {
        min_current = min_current.min(w);
        max_current = max_current.max(w);
        sum_current += w;
    }

    let current = worst_ratio(min_current, max_current, sum_current, length);
    let extended = worst_ratio(
        min_current.min(candidate),
        max_current.max(candidate),
        sum_current + candidate,
        length,
    );
    current >= extended
}

/// `max(L²·max / Σ², Σ² / (L²·min))` for a row of areas.
fn worst_ratio(min: f64, max: f64, sum: f64, length: f64) -> f64 {
    let side_sq = length * length;
    let sum_sq = sum * sum;
    let a = side_sq * max / sum_sq;
    let b = sum_sq / (side_sq * min);
    // NaN from degenerate input must not look like an improvement
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    a.max(b)
}

/// Turn `row` into a chain of blocks under `outside`, shrink `remaining` by the
/// consumed strip and return the container for what is left.
fn close_row(
    builder: &mut BlockTreeBuilder,
    outside: BlockId,
    remaining: &mut Rect,
    row: &[(EntityId, f64)],
) -> BlockId {
    let vertical_cut = remaining.width >= remaining.height;
    let area: f64 = row.iter().map(|&(_, w)| w).sum();

    // A vertical cut stacks the row as a column along the left edge;
    // a horizontal cut lays it out as a row along the top edge.
    let long = if vertical_cut {
        remaining.height
    } else {
        remaining.width
    };
    let thickness = finite_or_zero(area / long);

    let mut offset = 0.0;
    let mut previous: Option<BlockId> = None;
    for &(entity, w) in row {
        let length = finite_or_zero(w / thickness);
        let rect = if vertical_cut {
            Rect::new(remaining.x, remaining.y + offset, thickness, length)
        } else {
            Rect::new(remaining.x + offset, remaining.y, length, thickness)
        };
        offset += length;

        let block = builder.add(Some(entity), rect);
        match previous {
            Some(prev) if vertical_cut => builder.set_bottom(prev, block),
            Some(prev) => builder.set_right(prev, block),
            None => builder.set_central(outside, block),
        }
        previous = Some(block);
    }

    if thickness <= 0.0 {
        tracing::warn!(
            "Squarify: degenerate row of {} entities (area={}, long side={})",
            row.len(),
            area,
            long
        );
    }

    if vertical_cut {
        remaining.x += thickness;
        remaining.width = (remaining.width - thickness).max(0.0);
    } else {
        remaining.y += thickness;
        remaining.height = (remaining.height - thickness).max(0.0);
    }

    let next_outside = builder.add(None, *remaining);
    if vertical_cut {
        builder.set_right(outside, next_outside);
    } else {
        builder.set_bottom(outside, next_outside);
    }
    next_outside
}
