use playerhud_core::db::open_db_in_memory;
use playerhud_core::model::drop::GENERATED_CODE_LEN;
use playerhud_core::{
    CollectService, DropLimits, DropService, GameId, GameService, GameSettings, Item, ItemImage,
    ItemInput, ItemService, ServiceError, SqliteCollectRepository, SqliteDropRepository,
    SqliteGameRepository, SqliteItemRepository, ValidationError,
};
use rusqlite::Connection;

fn setup() -> (Connection, GameId) {
    let conn = open_db_in_memory().unwrap();
    let game = GameService::new(SqliteGameRepository::try_new(&conn).unwrap())
        .create_game(101, "Chemistry HUD", GameSettings::default())
        .unwrap();
    (conn, game.id)
}

fn items(conn: &Connection) -> ItemService<SqliteItemRepository<'_>> {
    ItemService::new(SqliteItemRepository::try_new(conn).unwrap())
}

fn drops(conn: &Connection) -> DropService<SqliteDropRepository<'_>> {
    DropService::new(SqliteDropRepository::try_new(conn).unwrap())
}

fn add_item(conn: &Connection, game_id: GameId, name: &str) -> Item {
    items(conn)
        .create_item(game_id, ItemInput::new(name, 10))
        .unwrap()
}

#[test]
fn game_settings_are_validated_and_persisted() {
    let conn = open_db_in_memory().unwrap();
    let games = GameService::new(SqliteGameRepository::try_new(&conn).unwrap());

    let err = games
        .create_game(
            5,
            "Broken",
            GameSettings {
                xp_per_level: 0,
                ..GameSettings::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidXpPerLevel(0))
    ));

    let game = games
        .create_game(5, "  Biology HUD ", GameSettings::default())
        .unwrap();
    assert_eq!(game.name, "Biology HUD");
    assert!(game.created_at > 0);

    let updated = games
        .update_settings(
            game.id,
            GameSettings {
                xp_per_level: 250,
                max_level: 10,
                ranking_enabled: false,
            },
        )
        .unwrap();
    assert_eq!(updated.settings.xp_per_level, 250);
    assert_eq!(updated.settings.max_level, 10);
    assert!(!updated.settings.ranking_enabled);

    games.create_game(6, "Other course", GameSettings::default()).unwrap();
    let listed = games.list_games(5).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, game.id);
}

#[test]
fn updating_unknown_game_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = GameService::new(SqliteGameRepository::try_new(&conn).unwrap())
        .update_settings(GameId::new_v4(), GameSettings::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "game", .. }));
}

#[test]
fn item_image_input_is_classified() {
    let (conn, game_id) = setup();

    let mut input = ItemInput::new("Key", 5);
    input.image = "🔑".to_string();
    let key = items(&conn).create_item(game_id, input).unwrap();
    assert_eq!(key.image, ItemImage::Emoji("🔑".to_string()));

    let mut input = ItemInput::new("Map", 5);
    input.image = "maps/old-map.png".to_string();
    let map = items(&conn).create_item(game_id, input).unwrap();
    assert_eq!(map.image, ItemImage::File("maps/old-map.png".to_string()));

    let mut input = ItemInput::new("Bad", 5);
    input.image = "not/an/image.exe".to_string();
    let err = items(&conn).create_item(game_id, input).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidImage(_))
    ));
}

#[test]
fn item_input_is_validated() {
    let (conn, game_id) = setup();
    let err = items(&conn)
        .create_item(game_id, ItemInput::new("   ", 5))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ValidationError::BlankName)));

    let err = items(&conn)
        .create_item(game_id, ItemInput::new("Cursed", -1))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::NegativeXp(-1))
    ));
}

#[test]
fn player_catalogue_hides_disabled_and_unowned_secrets() {
    let (mut conn, game_id) = setup();
    add_item(&conn, game_id, "Flask");
    let retired = add_item(&conn, game_id, "Retired");
    let mut input = ItemInput::new("Golden Beaker", 10);
    input.is_secret = true;
    let secret = items(&conn).create_item(game_id, input).unwrap();
    items(&conn).set_enabled(retired.id, false).unwrap();

    let names = |list: Vec<Item>| list.into_iter().map(|item| item.name).collect::<Vec<_>>();
    assert_eq!(
        names(items(&conn).catalogue_for_player(game_id, 7).unwrap()),
        vec!["Flask"]
    );
    assert_eq!(names(items(&conn).list_items(game_id, false).unwrap()).len(), 2);
    assert_eq!(names(items(&conn).list_items(game_id, true).unwrap()).len(), 3);

    CollectService::new(SqliteCollectRepository::try_new(&mut conn).unwrap())
        .grant_item(game_id, 7, secret.id, 1_000)
        .unwrap();
    assert_eq!(
        names(items(&conn).catalogue_for_player(game_id, 7).unwrap()),
        vec!["Flask", "Golden Beaker"]
    );
    assert_eq!(
        names(items(&conn).catalogue_for_player(game_id, 8).unwrap()),
        vec!["Flask"]
    );
}

#[test]
fn generated_codes_are_valid_and_resolvable() {
    let (conn, game_id) = setup();
    let flask = add_item(&conn, game_id, "Flask");

    let drop = drops(&conn)
        .create_drop(game_id, flask.id, "Lab bench", DropLimits::default(), None)
        .unwrap();
    assert_eq!(drop.code.len(), GENERATED_CODE_LEN);
    assert!(drop
        .code
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    assert_eq!(drop.max_usage, 1);

    let typed = drop.code.to_ascii_lowercase();
    let resolved = drops(&conn).resolve_code(game_id, &typed).unwrap();
    assert_eq!(resolved.map(|found| found.id), Some(drop.id));
}

#[test]
fn custom_codes_are_unique_per_game() {
    let (conn, game_id) = setup();
    let other_game = GameService::new(SqliteGameRepository::try_new(&conn).unwrap())
        .create_game(102, "Physics HUD", GameSettings::default())
        .unwrap();
    let flask = add_item(&conn, game_id, "Flask");
    let magnet = add_item(&conn, other_game.id, "Magnet");

    let first = drops(&conn)
        .create_drop(game_id, flask.id, "Bench", DropLimits::default(), Some(" bench1 "))
        .unwrap();
    assert_eq!(first.code, "BENCH1");

    let err = drops(&conn)
        .create_drop(game_id, flask.id, "Shelf", DropLimits::default(), Some("BENCH1"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::CodeCollision(code) if code == "BENCH1"));

    drops(&conn)
        .create_drop(
            other_game.id,
            magnet.id,
            "Bench",
            DropLimits::default(),
            Some("bench1"),
        )
        .unwrap();
}

#[test]
fn malformed_custom_code_is_rejected() {
    let (conn, game_id) = setup();
    let flask = add_item(&conn, game_id, "Flask");
    let err = drops(&conn)
        .create_drop(game_id, flask.id, "Bench", DropLimits::default(), Some("a-1"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidDropCode(_))
    ));
}

#[test]
fn drop_item_must_belong_to_the_game() {
    let (conn, game_id) = setup();
    let other_game = GameService::new(SqliteGameRepository::try_new(&conn).unwrap())
        .create_game(102, "Physics HUD", GameSettings::default())
        .unwrap();
    let magnet = add_item(&conn, other_game.id, "Magnet");

    let err = drops(&conn)
        .create_drop(game_id, magnet.id, "Bench", DropLimits::default(), None)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "item", .. }));
}

#[test]
fn regenerating_a_code_retires_the_old_one() {
    let (conn, game_id) = setup();
    let flask = add_item(&conn, game_id, "Flask");
    let drop = drops(&conn)
        .create_drop(game_id, flask.id, "Bench", DropLimits::default(), Some("BENCH1"))
        .unwrap();

    let rotated = drops(&conn).regenerate_code(drop.id).unwrap();
    assert_ne!(rotated.code, "BENCH1");
    assert!(drops(&conn).resolve_code(game_id, "BENCH1").unwrap().is_none());
    assert!(drops(&conn)
        .resolve_code(game_id, &rotated.code)
        .unwrap()
        .is_some());
}

#[test]
fn limits_and_names_can_be_edited() {
    let (conn, game_id) = setup();
    let flask = add_item(&conn, game_id, "Flask");
    let drop = drops(&conn)
        .create_drop(game_id, flask.id, "Bench", DropLimits::default(), None)
        .unwrap();

    let updated = drops(&conn)
        .update_limits(
            drop.id,
            DropLimits {
                max_usage: 0,
                cooldown_secs: 300,
            },
        )
        .unwrap();
    assert!(updated.is_unlimited());
    assert!(!updated.grants_xp());
    assert_eq!(updated.cooldown_secs, 300);

    let renamed = drops(&conn).rename_drop(drop.id, " Back bench ").unwrap();
    assert_eq!(renamed.name, "Back bench");
    assert_eq!(renamed.code, drop.code);

    let listed = drops(&conn).list_drops_for_item(flask.id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(drops(&conn).list_drops(game_id).unwrap().len(), 1);
}
