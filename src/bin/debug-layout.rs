/// Diagnostic tool to verify the scan → pack → per-revision solve pipeline
use revmap_rs::config::{RunConfig, USAGE};
use revmap_rs::layout::BlockTree;
use revmap_rs::manager::TreemapManager;
use revmap_rs::scanner;
use revmap_rs::tree::arena::EntityTree;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("revmap_rs=debug".parse()?),
        )
        .init();

    let config = RunConfig::from_args(std::env::args().skip(1))?;
    if config.help {
        print!("{}", USAGE);
        return Ok(());
    }

    println!("=== DIAGNOSTIC: Hierarchy → Layout Pipeline ===");
    println!("Inputs: {:?} ({:?})", config.inputs, config.input_kind);

    // Scan + build tree
    let tree = scanner::load(&config.inputs, config.input_kind)?;
    println!(
        "\n[1] Tree built: {} nodes, {} revisions",
        tree.len(),
        tree.number_of_revisions()
    );

    // Top 10 children of root by revision-0 weight
    println!("\n[2] Top 10 children of root (revision 0):");
    let mut root_children: Vec<_> = tree.children(tree.root).collect();
    root_children.sort_by(|&a, &b| tree.weight(b, 0).total_cmp(&tree.weight(a, 0)));
    for (i, child) in root_children.iter().take(10).enumerate() {
        let node = tree.get(*child);
        println!(
            "    [{}] '{}' - weight {:.2} (children={})",
            i,
            node.name,
            tree.weight(*child, 0),
            tree.children(*child).count()
        );
    }
    let dropped = root_children
        .iter()
        .filter(|&&c| tree.weight(c, 0) <= 0.0)
        .count();
    if dropped > 0 {
        println!("    {} children weigh 0 at revision 0 and get no block", dropped);
    }

    // Pack once
    let base = config.base_rect();
    let mut manager = TreemapManager::new(&tree, base, &config.layout);
    println!(
        "\n[3] Block tree: {} blocks, {} entity blocks",
        manager.blocks().len(),
        manager.blocks().entity_blocks().count()
    );

    // Solve every revision and check invariants
    println!("\n[4] Per-revision checks:");
    let base_area = base.area();
    for revision in 0..tree.number_of_revisions() {
        manager.solve(revision);
        let blocks = manager.blocks();

        let (leaf_area, invalid) = check_geometry(blocks, &tree, revision);
        println!(
            "    rev {:>4}: coverage {:>7.3}%, invalid rects {}",
            revision,
            leaf_area / base_area * 100.0,
            invalid
        );

        if let Some(worst) = blocks.worst_aspect_ratio_block() {
            let rect = blocks.rect(worst);
            if let Some(entity) = blocks.block(worst).entity {
                println!(
                    "              worst aspect ratio {:.2} at '{}' ({:.1}x{:.1})",
                    rect.aspect_ratio(),
                    tree.get(entity).id,
                    rect.width,
                    rect.height
                );
            }
        }
    }

    Ok(())
}

/// Leaf area sum and count of rectangles with negative or non-finite sides.
fn check_geometry(blocks: &BlockTree, tree: &EntityTree, revision: usize) -> (f64, usize) {
    let mut leaf_area = 0.0;
    let mut invalid = 0;
    for (id, entity) in blocks.entity_blocks() {
        let rect = blocks.rect(id);
        if !rect.width.is_finite() || !rect.height.is_finite() || rect.width < 0.0 || rect.height < 0.0 {
            invalid += 1;
            if invalid <= 5 {
                println!(
                    "    ✗ INVALID RECT @ rev {}: '{}' - {}x{} at ({}, {})",
                    revision,
                    tree.get(entity).id,
                    rect.width,
                    rect.height,
                    rect.x,
                    rect.y
                );
            }
            continue;
        }
        if blocks.is_leaf(id) {
            leaf_area += rect.area();
        }
    }
    (leaf_area, invalid)
}
