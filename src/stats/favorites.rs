use serde::Serialize;

use super::tally::Tally;
use crate::models::FavoriteSong;
use crate::parse::round2;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesSummary {
    pub count: usize,
    pub by_kind: Tally,
    pub frisson_count: usize,
    /// Mean final score over songs that have one.
    pub average_score: Option<f64>,
    /// Song count per anime, most first.
    pub by_anime: Vec<(String, u64)>,
}

pub fn summarize_favorites(songs: &[FavoriteSong]) -> FavoritesSummary {
    let mut summary = FavoritesSummary {
        count: songs.len(),
        ..Default::default()
    };
    let mut anime = Tally::new();
    let mut scores = Vec::new();

    for s in songs {
        summary.by_kind.add(s.kind.label());
        if s.frisson {
            summary.frisson_count += 1;
        }
        if let Some(score) = s.final_score() {
            scores.push(score);
        }
        if !s.anime.trim().is_empty() {
            anime.add(s.anime.trim());
        }
    }

    if !scores.is_empty() {
        summary.average_score = Some(round2(scores.iter().sum::<f64>() / scores.len() as f64));
    }
    summary.by_anime = anime.by_count();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SongKind;

    fn song(kind: SongKind, anime: &str, final_rating: Option<f64>, frisson: bool) -> FavoriteSong {
        FavoriteSong {
            kind,
            anime: anime.into(),
            title: "t".into(),
            artist: None,
            lyrics: Some(6.0),
            emotion: None,
            melody: None,
            video: None,
            voice: None,
            final_rating,
            frisson,
        }
    }

    #[test]
    fn test_summary() {
        let songs = vec![
            song(SongKind::Opening, "Mob Psycho 100", Some(9.0), true),
            song(SongKind::Ending, "Mob Psycho 100", None, false),
            song(SongKind::Opening, "Frieren", Some(8.0), true),
        ];
        let s = summarize_favorites(&songs);
        assert_eq!(s.count, 3);
        assert_eq!(s.by_kind.get("Opening"), 2);
        assert_eq!(s.frisson_count, 2);
        // 9, 6 (sub-rating average), 8
        assert_eq!(s.average_score, Some(7.67));
        assert_eq!(s.by_anime[0], ("Mob Psycho 100".to_string(), 2));
    }

    #[test]
    fn test_empty() {
        let s = summarize_favorites(&[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.average_score, None);
    }
}
