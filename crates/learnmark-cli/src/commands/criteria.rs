//! The `learnmark criteria` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use learnmark_core::criteria::CompletionCriterion;

pub fn execute() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Uses value", "Description"]);

    for criterion in CompletionCriterion::ALL {
        table.add_row(vec![
            Cell::new(criterion.id()),
            Cell::new(criterion.name()),
            Cell::new(if criterion.uses_required_value() { "yes" } else { "no" }),
            Cell::new(criterion.description()),
        ]);
    }

    println!("{table}");
    Ok(())
}
