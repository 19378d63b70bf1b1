use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use regex::Regex;

lazy_static! {
    /// Matches the track uris the player engine accepts
    pub static ref TRACK_URI_REGEX: Regex = Regex::new(r"^spotify:track:[A-Za-z0-9]+$").unwrap();
}

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Samples a six digit room code
pub fn random_room_code() -> String {
    thread_rng().gen_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_room_code_shape() {
        for _ in 0..100 {
            let code = random_room_code();

            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn test_track_uri_matching() {
        assert!(TRACK_URI_REGEX.is_match("spotify:track:4uLU6hMCjMI75M1A2tKUQC"));
        assert!(!TRACK_URI_REGEX.is_match("spotify:album:4uLU6hMCjMI75M1A2tKUQC"));
        assert!(!TRACK_URI_REGEX.is_match("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"));
        assert!(!TRACK_URI_REGEX.is_match(""));
    }
}
