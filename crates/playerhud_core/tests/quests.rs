use playerhud_core::db::open_db_in_memory;
use playerhud_core::repo::player_repo::PlayerRepository;
use playerhud_core::{
    CollectService, GameId, GameService, GameSettings, InventorySource, Item, ItemInput,
    ItemService, PlayerService, Quest, QuestError, QuestGoal, QuestInput, QuestService, RepoError,
    SqliteCollectRepository, SqliteGameRepository, SqliteItemRepository, SqlitePlayerRepository,
    SqliteQuestRepository, ValidationError,
};
use rusqlite::Connection;

const T0: i64 = 1_700_000_000_000;

fn setup() -> (Connection, GameId) {
    let conn = open_db_in_memory().unwrap();
    let game = GameService::new(SqliteGameRepository::try_new(&conn).unwrap())
        .create_game(101, "Chemistry HUD", GameSettings::default())
        .unwrap();
    (conn, game.id)
}

fn add_item(conn: &Connection, game_id: GameId, name: &str, xp: i64) -> Item {
    ItemService::new(SqliteItemRepository::try_new(conn).unwrap())
        .create_item(game_id, ItemInput::new(name, xp))
        .unwrap()
}

fn quests(conn: &mut Connection) -> QuestService<SqliteQuestRepository<'_>> {
    QuestService::new(SqliteQuestRepository::try_new(conn).unwrap())
}

fn add_quest(conn: &mut Connection, game_id: GameId, input: QuestInput) -> Quest {
    quests(conn).create_quest(game_id, input, T0).unwrap()
}

fn grant(conn: &mut Connection, game_id: GameId, user_id: i64, item: &Item, now_ms: i64) {
    CollectService::new(SqliteCollectRepository::try_new(conn).unwrap())
        .grant_item(game_id, user_id, item.id, now_ms)
        .unwrap();
}

fn player_xp(conn: &Connection, game_id: GameId, user_id: i64) -> i64 {
    SqlitePlayerRepository::try_new(conn)
        .unwrap()
        .get_player(game_id, user_id)
        .unwrap()
        .map_or(0, |player| player.xp)
}

#[test]
fn claim_requires_goal_then_credits_reward_once() {
    let (mut conn, game_id) = setup();
    let flask = add_item(&conn, game_id, "Flask", 100);
    let quest = add_quest(
        &mut conn,
        game_id,
        QuestInput::new("Reach 100 XP", QuestGoal::ReachXp { xp: 100 }, 50),
    );

    let err = quests(&mut conn)
        .claim(game_id, 7, quest.id, T0)
        .unwrap_err();
    assert!(matches!(
        err,
        QuestError::NotComplete {
            current: 0,
            target: 100
        }
    ));

    grant(&mut conn, game_id, 7, &flask, T0 + 1);
    let receipt = quests(&mut conn)
        .claim(game_id, 7, quest.id, T0 + 2)
        .unwrap();
    assert_eq!(receipt.claim.reward_xp, 50);
    assert_eq!(receipt.total_xp, 150);
    assert!(receipt.reward_entry.is_none());
    assert_eq!(receipt.level_before, 2);
    assert_eq!(receipt.level_after, 2);
    assert_eq!(player_xp(&conn, game_id, 7), 150);

    let err = quests(&mut conn)
        .claim(game_id, 7, quest.id, T0 + 3)
        .unwrap_err();
    assert!(matches!(err, QuestError::AlreadyClaimed(id) if id == quest.id));
    assert_eq!(player_xp(&conn, game_id, 7), 150);
}

#[test]
fn reward_item_lands_in_inventory_with_its_xp() {
    let (mut conn, game_id) = setup();
    let flask = add_item(&conn, game_id, "Flask", 10);
    let badge = add_item(&conn, game_id, "Badge", 25);
    let mut input = QuestInput::new("First find", QuestGoal::CollectItems { count: 1 }, 0);
    input.reward_item_id = Some(badge.id);
    let quest = add_quest(&mut conn, game_id, input);

    grant(&mut conn, game_id, 7, &flask, T0);
    let receipt = quests(&mut conn)
        .claim(game_id, 7, quest.id, T0 + 1)
        .unwrap();

    let entry = receipt.reward_entry.unwrap();
    assert_eq!(entry.item_id, badge.id);
    assert_eq!(entry.source, InventorySource::Quest);
    assert_eq!(entry.xp_awarded, 25);
    assert_eq!(receipt.claim.reward_xp, 25);
    assert_eq!(receipt.total_xp, 35);

    let inventory = SqlitePlayerRepository::try_new(&conn)
        .unwrap()
        .list_inventory(game_id, 7)
        .unwrap();
    let items: Vec<_> = inventory.iter().map(|entry| entry.item_id).collect();
    assert_eq!(items, vec![flask.id, badge.id]);
}

#[test]
fn specific_item_goal_counts_only_that_item() {
    let (mut conn, game_id) = setup();
    let flask = add_item(&conn, game_id, "Flask", 10);
    let herb = add_item(&conn, game_id, "Herb", 10);
    let quest = add_quest(
        &mut conn,
        game_id,
        QuestInput::new(
            "Two flasks",
            QuestGoal::CollectItem {
                item_id: flask.id,
                count: 2,
            },
            20,
        ),
    );

    grant(&mut conn, game_id, 7, &flask, T0);
    grant(&mut conn, game_id, 7, &herb, T0 + 1);
    let err = quests(&mut conn)
        .claim(game_id, 7, quest.id, T0 + 2)
        .unwrap_err();
    assert!(matches!(
        err,
        QuestError::NotComplete {
            current: 1,
            target: 2
        }
    ));

    grant(&mut conn, game_id, 7, &flask, T0 + 3);
    quests(&mut conn)
        .claim(game_id, 7, quest.id, T0 + 4)
        .unwrap();
}

#[test]
fn activity_goal_uses_recorded_completions() {
    let (mut conn, game_id) = setup();
    let quest = add_quest(
        &mut conn,
        game_id,
        QuestInput::new(
            "Finish the lab report",
            QuestGoal::CompleteActivity { activity_id: 77 },
            40,
        ),
    );

    let hud = PlayerService::new(
        SqlitePlayerRepository::try_new(&conn).unwrap(),
        SqliteGameRepository::try_new(&conn).unwrap(),
    );
    assert!(hud.record_activity_completion(game_id, 7, 77, T0).unwrap());
    assert!(!hud.record_activity_completion(game_id, 7, 77, T0 + 1).unwrap());

    let receipt = quests(&mut conn)
        .claim(game_id, 7, quest.id, T0 + 2)
        .unwrap();
    assert_eq!(receipt.total_xp, 40);
}

#[test]
fn level_goal_follows_game_settings() {
    let (mut conn, game_id) = setup();
    let gem = add_item(&conn, game_id, "Gem", 250);
    let quest = add_quest(
        &mut conn,
        game_id,
        QuestInput::new("Level 3", QuestGoal::ReachLevel { level: 3 }, 5),
    );

    grant(&mut conn, game_id, 7, &gem, T0);
    let board = quests(&mut conn).quests_for_player(game_id, 7).unwrap();
    assert_eq!(board.len(), 1);
    assert!(board[0].progress.complete);
    assert!(board[0].is_claimable());
    assert_eq!(quest.id, board[0].quest.id);
}

#[test]
fn quest_board_shows_progress_claims_and_hides_disabled() {
    let (mut conn, game_id) = setup();
    let flask = add_item(&conn, game_id, "Flask", 10);
    let first = add_quest(
        &mut conn,
        game_id,
        QuestInput::new("One item", QuestGoal::CollectItems { count: 1 }, 5),
    );
    let second = add_quest(
        &mut conn,
        game_id,
        QuestInput::new("Three items", QuestGoal::CollectItems { count: 3 }, 5),
    );
    let mut hidden = QuestInput::new("Hidden", QuestGoal::CollectItems { count: 1 }, 5);
    hidden.is_enabled = false;
    add_quest(&mut conn, game_id, hidden);

    grant(&mut conn, game_id, 7, &flask, T0);
    quests(&mut conn)
        .claim(game_id, 7, first.id, T0 + 1)
        .unwrap();

    let board = quests(&mut conn).quests_for_player(game_id, 7).unwrap();
    assert_eq!(board.len(), 2);
    let first_status = board.iter().find(|s| s.quest.id == first.id).unwrap();
    assert!(first_status.claimed);
    assert!(!first_status.is_claimable());
    let second_status = board.iter().find(|s| s.quest.id == second.id).unwrap();
    assert!(!second_status.claimed);
    assert_eq!(second_status.progress.current, 1);
    assert_eq!(second_status.progress.target, 3);

    let all = quests(&mut conn).list_quests(game_id, true).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn fresh_player_board_evaluates_from_zero() {
    let (mut conn, game_id) = setup();
    add_quest(
        &mut conn,
        game_id,
        QuestInput::new("Level 2", QuestGoal::ReachLevel { level: 2 }, 5),
    );

    let board = quests(&mut conn).quests_for_player(game_id, 42).unwrap();
    assert_eq!(board[0].progress.current, 1);
    assert!(!board[0].progress.complete);
    assert!(SqlitePlayerRepository::try_new(&conn)
        .unwrap()
        .get_player(game_id, 42)
        .unwrap()
        .is_none());
}

#[test]
fn disabled_and_foreign_quests_cannot_be_claimed() {
    let (mut conn, game_id) = setup();
    let other_game = GameService::new(SqliteGameRepository::try_new(&conn).unwrap())
        .create_game(102, "Physics HUD", GameSettings::default())
        .unwrap();
    let mut input = QuestInput::new("Off", QuestGoal::ReachLevel { level: 1 }, 5);
    input.is_enabled = false;
    let disabled = add_quest(&mut conn, game_id, input);
    let foreign = add_quest(
        &mut conn,
        other_game.id,
        QuestInput::new("Elsewhere", QuestGoal::ReachLevel { level: 1 }, 5),
    );

    let err = quests(&mut conn)
        .claim(game_id, 7, disabled.id, T0)
        .unwrap_err();
    assert!(matches!(err, QuestError::QuestDisabled(_)));

    let err = quests(&mut conn)
        .claim(game_id, 7, foreign.id, T0)
        .unwrap_err();
    assert!(matches!(err, QuestError::QuestNotFound(_)));
}

#[test]
fn opted_out_player_cannot_claim() {
    let (mut conn, game_id) = setup();
    let quest = add_quest(
        &mut conn,
        game_id,
        QuestInput::new("Level 1", QuestGoal::ReachLevel { level: 1 }, 5),
    );
    PlayerService::new(
        SqlitePlayerRepository::try_new(&conn).unwrap(),
        SqliteGameRepository::try_new(&conn).unwrap(),
    )
    .set_enabled(game_id, 7, false, T0)
    .unwrap();

    let err = quests(&mut conn)
        .claim(game_id, 7, quest.id, T0 + 1)
        .unwrap_err();
    assert!(matches!(err, QuestError::PlayerDisabled { user_id: 7, .. }));
    assert_eq!(player_xp(&conn, game_id, 7), 0);
}

#[test]
fn quest_without_any_reward_is_rejected() {
    let (mut conn, game_id) = setup();
    let err = quests(&mut conn)
        .create_quest(
            game_id,
            QuestInput::new("Nothing", QuestGoal::ReachXp { xp: 10 }, 0),
            T0,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        QuestError::Validation(ValidationError::MissingReward)
    ));
}

#[test]
fn reward_item_must_belong_to_the_game() {
    let (mut conn, game_id) = setup();
    let other_game = GameService::new(SqliteGameRepository::try_new(&conn).unwrap())
        .create_game(102, "Physics HUD", GameSettings::default())
        .unwrap();
    let magnet = add_item(&conn, other_game.id, "Magnet", 10);

    let mut input = QuestInput::new("Borrowed reward", QuestGoal::ReachXp { xp: 10 }, 0);
    input.reward_item_id = Some(magnet.id);
    let err = quests(&mut conn)
        .create_quest(game_id, input, T0)
        .unwrap_err();
    assert!(matches!(
        err,
        QuestError::Repo(RepoError::NotFound { entity: "item", .. })
    ));
}

#[test]
fn update_quest_replaces_goal_and_reward() {
    let (mut conn, game_id) = setup();
    let quest = add_quest(
        &mut conn,
        game_id,
        QuestInput::new("Draft", QuestGoal::ReachXp { xp: 10 }, 5),
    );

    let updated = quests(&mut conn)
        .update_quest(
            quest.id,
            QuestInput::new("  Final  ", QuestGoal::CollectItems { count: 4 }, 30),
        )
        .unwrap();
    assert_eq!(updated.name, "Final");
    assert_eq!(updated.goal, QuestGoal::CollectItems { count: 4 });
    assert_eq!(updated.reward_xp, 30);
}
