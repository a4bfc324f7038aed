//! Integration tests for loading and saving the catalogue file.

use data_loader::{Catalogue, DataLoadError, MalformedPolicy, NewMovie};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str =
    "id::title::popularity::genres::actors::directors::genres_bin::actors_bin::directors_bin::poster";

fn write_file(dir: &TempDir, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join("movie_data.dat");
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

fn sample_rows() -> Vec<&'static str> {
    vec![
        "19995::Avatar::150::Action|Science Fiction::Sam Worthington|Zoe Saldana::James Cameron::11::110::10::https://img/avatar.jpg",
        "285::Pirates of the Caribbean::139::Action::Johnny Depp::Gore Verbinski::10::001::01::",
        "206647::Spectre::107::Action|Science Fiction::Daniel Craig::Sam Mendes::11::001::00::https://img/spectre.jpg",
    ]
}

#[test]
fn test_load_sample_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, &sample_rows());

    let catalogue = Catalogue::load_from_file(&path, MalformedPolicy::Abort).unwrap();

    assert_eq!(catalogue.len(), 3);
    assert_eq!(catalogue.all_ids(), vec![206647, 285, 19995]);
    assert_eq!(catalogue.get(19995).unwrap().normalized_popularity, 1.0);
    assert_eq!(catalogue.get(285).unwrap().poster, None);
    assert_eq!(catalogue.vocabularies().genres.len(), 2);
    assert_eq!(catalogue.vocabularies().actors.len(), 4);
    assert_eq!(catalogue.vocabularies().directors.len(), 3);
}

#[test]
fn test_missing_file_is_data_unavailable() {
    let err = Catalogue::load_from_file(Path::new("/nonexistent/movie_data.dat"), MalformedPolicy::Abort)
        .unwrap_err();
    assert!(matches!(err, DataLoadError::DataUnavailable { .. }));
}

#[test]
fn test_missing_column_is_data_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("movie_data.dat");
    fs::write(&path, "id::title::popularity\n1::A::1\n").unwrap();

    let err = Catalogue::load_from_file(&path, MalformedPolicy::Skip).unwrap_err();
    assert!(matches!(err, DataLoadError::DataUnavailable { .. }));
}

#[test]
fn test_malformed_row_policies() {
    let dir = TempDir::new().unwrap();
    let mut rows = sample_rows();
    rows.insert(1, "77::Broken::not-a-number::::::::::::::");
    let path = write_file(&dir, &rows);

    let err = Catalogue::load_from_file(&path, MalformedPolicy::Abort).unwrap_err();
    assert!(matches!(err, DataLoadError::MalformedRecord { line: 3, .. }));

    let catalogue = Catalogue::load_from_file(&path, MalformedPolicy::Skip).unwrap();
    assert_eq!(catalogue.len(), 3);
    assert!(catalogue.get(77).is_none());
}

#[test]
fn test_duplicate_key_fails_load_under_both_policies() {
    let dir = TempDir::new().unwrap();
    let mut rows = sample_rows();
    rows.push("285::Pirates Again::10::::::::::::::");
    let path = write_file(&dir, &rows);

    for policy in [MalformedPolicy::Abort, MalformedPolicy::Skip] {
        let err = Catalogue::load_from_file(&path, policy).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateKey { id: 285 }));
    }
}

#[test]
fn test_save_then_load_preserves_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, &sample_rows());

    let mut catalogue = Catalogue::load_from_file(&path, MalformedPolicy::Abort).unwrap();
    catalogue
        .append_movie(NewMovie {
            id: 49026,
            title: "The Dark Knight Rises: Part|One".to_string(),
            popularity: 112.3,
            poster: Some("https://img/tdkr.jpg".to_string()),
            genres: vec!["Action".to_string(), "Crime".to_string()],
            actors: vec!["Christian Bale".to_string()],
            directors: vec!["Christopher Nolan".to_string()],
        })
        .unwrap();
    catalogue.save_to_file(&path).unwrap();

    let reloaded = Catalogue::load_from_file(&path, MalformedPolicy::Abort).unwrap();
    assert_eq!(reloaded.all_ids(), catalogue.all_ids());
    for movie in catalogue.iter() {
        let other = reloaded.get(movie.id).unwrap();
        assert_eq!(other.title, movie.title);
        assert_eq!(other.popularity, movie.popularity);
        assert_eq!(other.poster, movie.poster);
        assert_eq!(other.genres, movie.genres);
        assert_eq!(other.actors, movie.actors);
        assert_eq!(other.directors, movie.directors);
        assert_eq!(other.features, movie.features);
    }

    // The appended movie saw new terms, so its vocabulary grew on reload
    assert_eq!(reloaded.vocabularies().genres.len(), 3);
}

#[test]
fn test_save_refused_after_skipping_rows() {
    let dir = TempDir::new().unwrap();
    let mut rows = sample_rows();
    rows.push("2::B::oops::::::::::::::");
    let path = write_file(&dir, &rows);
    let before = fs::read_to_string(&path).unwrap();

    let mut catalogue = Catalogue::load_from_file(&path, MalformedPolicy::Skip).unwrap();
    assert_eq!(catalogue.skipped_rows(), 1);

    catalogue.rebuild_vectors();
    let err = catalogue.save_to_file(&path).unwrap_err();
    assert!(matches!(err, DataLoadError::IncompleteCatalogue { skipped: 1 }));

    // The malformed row is still on disk
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
    assert!(before.contains("2::B::oops"));
}

#[test]
fn test_hash_title_survives_load() {
    let dir = TempDir::new().unwrap();
    let mut rows = sample_rows();
    rows.push("614696::#Alive::50::Horror::Yoo Ah-in::Cho Il-hyung::::::::");
    let path = write_file(&dir, &rows);

    let catalogue = Catalogue::load_from_file(&path, MalformedPolicy::Abort).unwrap();
    assert_eq!(catalogue.title_of(614696), "#Alive");
    assert_eq!(catalogue.skipped_rows(), 0);
}
