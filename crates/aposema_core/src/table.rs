use crate::sweep::SweepRow;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Column order of the result table. External plotting consumers rely on
/// these names and positions; changing them is a breaking change.
pub const HEADER: &str = "AB,SR,ab,sr,b,d,p,l1,k1,l2,k2,cw,cb,K,a,B,eq_sp1,eq_sp2,coexistence,F,M,f,m";

/// Renders the rows as a CSV document: one header line, one line per tuple.
/// Persistence flags are written as 0/1 integers, everything else as full
/// round-trip floating point.
pub fn render_csv(rows: &[SweepRow]) -> String {
    let mut out = String::with_capacity(64 + rows.len() * 128);
    out.push_str(HEADER);
    out.push('\n');
    for row in rows {
        let p = &row.params;
        let o = &row.outcome;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            p.ab1,
            p.sr1,
            p.ab2,
            p.sr2,
            p.b,
            p.d,
            p.p,
            p.l1,
            p.k1,
            p.l2,
            p.k2,
            p.cw,
            p.cb,
            p.k_cap,
            p.a,
            p.b_mim,
            u8::from(o.eq_sp1),
            u8::from(o.eq_sp2),
            u8::from(o.coexistence),
            o.state[0],
            o.state[1],
            o.state[2],
            o.state[3],
        )
        .expect("write to String cannot fail");
    }
    out
}

/// Writes the rendered table to `path`.
pub fn write_csv(path: &Path, rows: &[SweepRow]) -> Result<()> {
    fs::write(path, render_csv(rows))
        .with_context(|| format!("failed to write result table to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{render_csv, HEADER};
    use crate::equilibrium::{Outcome, Termination};
    use crate::params::baseline;
    use crate::sweep::{SweepRow, TupleId};

    fn sample_row() -> SweepRow {
        SweepRow {
            id: TupleId {
                draw: 0,
                a_idx: 0,
                b_idx: 0,
            },
            params: baseline(),
            outcome: Outcome {
                eq_sp1: true,
                eq_sp2: false,
                coexistence: false,
                state: [620.25, 310.5, 0.0, 0.0],
                rounds: 7,
                termination: Termination::Converged,
            },
        }
    }

    #[test]
    fn header_matches_the_published_contract() {
        assert_eq!(
            HEADER,
            "AB,SR,ab,sr,b,d,p,l1,k1,l2,k2,cw,cb,K,a,B,eq_sp1,eq_sp2,coexistence,F,M,f,m"
        );
    }

    #[test]
    fn rows_render_flags_as_integers_and_counts_as_floats() {
        let csv = render_csv(&[sample_row()]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(HEADER));
        let row = lines.next().expect("one data row");
        assert_eq!(lines.next(), None);

        let cells: Vec<&str> = row.split(',').collect();
        assert_eq!(cells.len(), 23);
        assert_eq!(cells[0], "1000");
        assert_eq!(cells[16], "1");
        assert_eq!(cells[17], "0");
        assert_eq!(cells[18], "0");
        assert_eq!(cells[19], "620.25");
        assert_eq!(cells[22], "0");
    }

    #[test]
    fn empty_sweep_still_produces_a_well_formed_table() {
        let csv = render_csv(&[]);
        assert_eq!(csv, format!("{HEADER}\n"));
    }
}
