use crate::libs::align::{AlignmentResult, StepKind};
use itertools::Itertools;

/// Text view of an alignment, wrapped at `width` columns.
///
/// ```text
/// a          1 MADRGFCSADGSDPLWDW 18
///              || |||||||||| ||||
/// b          1 MANRGFCSADG-WPLWDW 17
/// ```
///
/// Every block shows the residues of A, the match track (`|` identical, `:`
/// similar, space otherwise) and the residues of B, with gaps drawn as `-`.
/// Positions are 1-based, the number after a row is its last residue.
pub fn render(res: &AlignmentResult, width: usize) -> String {
    let width = width.max(1);
    let name_width = res.name_a.len().max(res.name_b.len()).max(10);
    let mut out = String::new();

    if res.path.is_empty() {
        return out;
    }

    // Coordinates of the residue before the first step
    let first = &res.path[0];
    let mut pos_a = match first.kind {
        StepKind::Insertion => first.i,
        _ => first.i - 1,
    };
    let mut pos_b = match first.kind {
        StepKind::Deletion => first.j,
        _ => first.j - 1,
    };

    let blocks = res.path.iter().chunks(width);
    for (n, block) in (&blocks).into_iter().enumerate() {
        let mut row_a = String::new();
        let mut track = String::new();
        let mut row_b = String::new();
        let start_a = pos_a + 1;
        let start_b = pos_b + 1;

        for step in block {
            row_a.push(step.residue_a.map_or('-', |r| r as char));
            row_b.push(step.residue_b.map_or('-', |r| r as char));
            track.push(match step.kind {
                StepKind::Substitution => step.class.symbol(),
                _ => ' ',
            });
            if step.residue_a.is_some() {
                pos_a += 1;
            }
            if step.residue_b.is_some() {
                pos_b += 1;
            }
        }

        if n > 0 {
            out.push('\n');
        }
        out += &format!(
            "{:<nw$} {:>6} {} {}\n",
            res.name_a,
            start_a,
            row_a,
            pos_a,
            nw = name_width
        );
        out += &format!("{:<nw$} {:>6} {}\n", "", "", track, nw = name_width);
        out += &format!(
            "{:<nw$} {:>6} {} {}\n",
            res.name_b,
            start_b,
            row_b,
            pos_b,
            nw = name_width
        );
    }

    out
}

/// One-paragraph summary followed by the rendering.
pub fn report(res: &AlignmentResult, width: usize) -> String {
    let (identity, similarity) = res.identity_similarity();
    let mut out = format!(
        "# {} ({} aa) vs {} ({} aa)\n# Score: {}\n# Identity: {}/{} ({:.1}%)\n# Similarity: {}/{} ({:.1}%)\n# Gaps: {}\n\n",
        res.name_a,
        res.len_a,
        res.name_b,
        res.len_b,
        res.score,
        res.identical,
        res.len_a.max(res.len_b),
        identity,
        res.identical + res.similar,
        res.len_a.max(res.len_b),
        similarity,
        res.gap_steps(),
    );
    out += &render(res, width);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::align::align;
    use crate::libs::matrix::{GapPenalties, SubMatrix};

    fn run(a: &str, b: &str) -> AlignmentResult {
        align(
            "a",
            a.as_bytes(),
            "b",
            b.as_bytes(),
            &SubMatrix::blosum62(),
            &GapPenalties::new(10, 1),
        )
        .unwrap()
    }

    #[test]
    fn test_render_tracks() {
        let res = run("HEAGAWGHEE", "PAWHEAE");
        let text = render(&res, 60);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "a               5 AWGHE 9");
        assert_eq!(lines[1], "                  || ||");
        assert_eq!(lines[2], "b               2 AW-HE 5");
    }

    #[test]
    fn test_render_wraps() {
        let res = run(
            "MADRGFCSADGSDPLWDWNVTWNTSNPDFTKCF",
            "MANRGFCSADGWPLWDWDVTWNTSNPDFTKCF",
        );
        let text = render(&res, 10);
        let blocks: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(blocks.len(), 4);
        assert!(blocks[0].starts_with("a               1 MADRGFCSAD 10"));
        assert!(blocks[1].contains("b              11 GW-PLWDWDV 19"));
        // similar pair S/W is not similar (-3), N/D is (+1)
        assert!(blocks[0].lines().nth(1).unwrap().contains("||:|"));
    }

    #[test]
    fn test_report_and_empty() {
        let res = run("WWWW", "PPPP");
        assert_eq!(render(&res, 60), "");
        let text = report(&res, 60);
        assert!(text.contains("# Score: 0"));
        assert!(text.contains("# Identity: 0/4 (0.0%)"));
    }
}
