//! Line reconstruction from positioned words.

use crate::model::{Line, Word};

/// Cluster words into text lines.
///
/// Words are ordered by vertical band (`round(top / tolerance)`) and then by
/// `x0`. A word joins the current cluster when its top lies within
/// `tolerance` of the top of the word that opened it; otherwise it opens a
/// new one. Band order only drives clustering: each finished cluster is
/// re-sorted by `x0`, since words of one visual line can straddle a band
/// boundary.
pub fn group_words_into_lines(words: Vec<Word>, tolerance: f32) -> Vec<Line> {
    let tolerance = if tolerance > 0.0 { tolerance } else { 0.1 };

    let mut words = words;
    words.sort_by(|a, b| {
        let band_a = (a.top / tolerance).round();
        let band_b = (b.top / tolerance).round();
        band_a.total_cmp(&band_b).then(a.x0.total_cmp(&b.x0))
    });

    let mut clusters: Vec<(f32, Vec<Word>)> = Vec::new();
    for word in words {
        match clusters.last_mut() {
            Some((anchor, members)) if (word.top - *anchor).abs() <= tolerance => {
                members.push(word);
            }
            _ => clusters.push((word.top, vec![word])),
        }
    }

    clusters
        .into_iter()
        .filter_map(|(_, members)| build_line(members))
        .collect()
}

fn build_line(mut words: Vec<Word>) -> Option<Line> {
    words.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    let mut words = words.into_iter();
    let mut line = Line::start(words.next()?);
    for word in words {
        line.push(word);
    }
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(group_words_into_lines(Vec::new(), 3.0).is_empty());
    }

    #[test]
    fn test_words_ordered_left_to_right() {
        let words = vec![
            Word::new("Problems", 160.0, 100.0, 112.0),
            Word::new("Section", 72.0, 100.5, 112.0),
            Word::new("2.1", 130.0, 99.8, 112.5),
        ];
        let lines = group_words_into_lines(words, 3.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Section 2.1 Problems");
        assert_eq!(lines[0].top, 99.8);
        assert_eq!(lines[0].bottom, 112.5);
    }

    #[test]
    fn test_header_straddling_band_boundary() {
        // 100.5 rounds into the next band, 100.0 does not
        let words = vec![
            Word::new("Section", 72.0, 100.5, 112.5),
            Word::new("2.1", 130.0, 100.0, 112.0),
            Word::new("Problems", 160.0, 100.0, 112.0),
            Word::new("2.1.1.", 72.0, 130.0, 142.0),
        ];
        let lines = group_words_into_lines(words, 3.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Section 2.1 Problems", "2.1.1."]);
        assert_eq!(lines[0].top, 100.0);
        assert_eq!(lines[0].bottom, 112.5);
    }

    #[test]
    fn test_lines_ordered_top_to_bottom() {
        let words = vec![
            Word::new("second", 72.0, 150.0, 160.0),
            Word::new("first", 72.0, 100.0, 110.0),
            Word::new("third", 72.0, 200.0, 210.0),
        ];
        let lines = group_words_into_lines(words, 3.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_every_word_lands_in_one_line() {
        let words: Vec<Word> = (0..20)
            .map(|i| {
                let top = (i / 4) as f32 * 14.0;
                Word::new(format!("w{}", i), (i % 4) as f32 * 50.0, top, top + 10.0)
            })
            .collect();
        let lines = group_words_into_lines(words, 3.0);
        assert_eq!(lines.len(), 5);
        let total: usize = lines.iter().map(|l| l.text.split(' ').count()).sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn test_outside_tolerance_splits() {
        let words = vec![
            Word::new("a", 72.0, 100.0, 110.0),
            Word::new("b", 90.0, 104.0, 114.0),
        ];
        assert_eq!(group_words_into_lines(words, 3.0).len(), 2);
    }
}
