//! Clients synchronizing through an authoritative master.

use std::sync::{Arc, Mutex};

use rust_tbg::core::{Action, PlayerId, TransportError};
use rust_tbg::flow::{FlowConfig, TurnOrder};
use rust_tbg::game::{Game, GameDefinition};
use rust_tbg::games::tictactoe::{self, Board, CLICK_CELL};
use rust_tbg::net::{
    FlatFileStorage, Inbound, InMemoryStorage, LocalServer, Master, Outbound, Storage, Transport,
    UpdateOutcome,
};
use rust_tbg::{Client, ClientConfig};
use serde_json::{json, Value};

fn seat(game: &Arc<Game<Board>>, player: u8) -> Client<Board> {
    let config = ClientConfig::default()
        .with_multiplayer(true)
        .with_player(PlayerId::new(player))
        .with_match_id("table-1");
    Client::new(Arc::clone(game), config).unwrap()
}

fn tictactoe_server(game: &Arc<Game<Board>>) -> Arc<LocalServer<Board>> {
    let master = Master::new(Arc::clone(game), InMemoryStorage::new());
    master.create_match("table-1", 2).unwrap();
    LocalServer::new(master)
}

#[test]
fn test_moves_reach_the_other_seat() {
    let game = Arc::new(tictactoe::game().unwrap());
    let server = tictactoe_server(&game);
    let mut x = seat(&game, 0);
    let mut o = seat(&game, 1);
    x.connect_with(server.transport("table-1")).unwrap();
    o.connect_with(server.transport("table-1")).unwrap();
    x.sync();
    o.sync();

    assert!(x.moves().call(CLICK_CELL, [json!(4)]));
    o.sync();
    assert_eq!(o.get_state().g.cells[4], Some(PlayerId::new(0)));
    assert_eq!(o.get_state().state_id, 1);

    assert!(o.moves().call(CLICK_CELL, [json!(0)]));
    x.sync();
    assert_eq!(x.store().state(), o.store().state());
    assert_eq!(server.master().on_sync("table-1").unwrap().state_id, 2);
}

#[test]
fn test_connect_adopts_authoritative_state() {
    let game = Arc::new(tictactoe::game().unwrap());
    let server = tictactoe_server(&game);

    // Play offline first; the server never hears of it.
    let mut x = seat(&game, 0);
    assert!(x.moves().call(CLICK_CELL, [json!(8)]));

    x.connect_with(server.transport("table-1")).unwrap();
    assert_eq!(x.get_state().g.cells[8], Some(PlayerId::new(0)));
    assert_eq!(x.sync(), 1);
    assert_eq!(x.get_state().g, Board::default());
}

/// Both seats may act at any time.
fn free_for_all() -> Arc<Game<Vec<u8>>> {
    Arc::new(
        GameDefinition::new("shout")
            .with_setup(|_| Vec::new())
            .with_move("say", |g: &Vec<u8>, mv, _: &[Value]| {
                let mut next = g.clone();
                next.push(mv.player_id.map_or(u8::MAX, |p| p.0));
                next
            })
            .with_flow(FlowConfig::new().with_turn_order(TurnOrder::Any))
            .build()
            .unwrap(),
    )
}

#[test]
fn test_stale_update_is_rolled_back() {
    let game = free_for_all();
    let master = Master::new(Arc::clone(&game), InMemoryStorage::new());
    master.create_match("default", 2).unwrap();
    let server = LocalServer::new(master);

    let config = |p| {
        ClientConfig::default()
            .with_multiplayer(true)
            .with_player(PlayerId::new(p))
    };
    let mut a = Client::new(Arc::clone(&game), config(0)).unwrap();
    let mut b = Client::new(Arc::clone(&game), config(1)).unwrap();
    a.connect_with(server.transport("default")).unwrap();
    b.connect_with(server.transport("default")).unwrap();
    a.sync();
    b.sync();

    // Both act against state 0; a's update lands first.
    assert!(a.moves().call("say", []));
    assert!(b.moves().call("say", []));
    assert_eq!(b.get_state().g, [1]);

    b.sync();
    assert_eq!(b.get_state().g, [0]);
    a.sync();
    assert_eq!(a.get_state().g, [0]);
    assert_eq!(server.master().on_sync("default").unwrap().state_id, 1);
}

#[test]
fn test_disconnect_keeps_local_state() {
    let game = Arc::new(tictactoe::game().unwrap());
    let server = tictactoe_server(&game);
    let mut x = seat(&game, 0).with_transport(server.transport("table-1"));
    x.connect().unwrap();
    x.sync();
    assert!(x.is_connected());

    x.disconnect();
    assert!(!x.is_connected());
    assert_eq!(server.connection_count(), 0);

    assert!(x.moves().call(CLICK_CELL, [json!(4)]));
    assert_eq!(x.sync(), 0);
    assert_eq!(x.get_state().g.cells[4], Some(PlayerId::new(0)));
    assert_eq!(server.master().on_sync("table-1").unwrap().state_id, 0);

    // Reconnecting reopens the same transport and rolls back to the master.
    x.connect().unwrap();
    assert_eq!(server.connection_count(), 1);
    x.sync();
    assert_eq!(x.get_state().g, Board::default());
}

#[test]
fn test_configured_transport_opens_on_connect() {
    let game = Arc::new(tictactoe::game().unwrap());
    let server = tictactoe_server(&game);
    let mut x = seat(&game, 0).with_transport(server.transport("table-1"));
    assert!(!x.is_connected());

    // Not yet connected, so nothing is forwarded.
    assert!(x.moves().call(CLICK_CELL, [json!(4)]));
    assert_eq!(server.master().on_sync("table-1").unwrap().state_id, 0);

    x.connect().unwrap();
    assert!(x.is_connected());
    assert_eq!(x.sync(), 1);
    assert_eq!(x.get_state().state_id, 0);
}

#[test]
fn test_connect_without_transport_stays_offline() {
    let game = Arc::new(tictactoe::game().unwrap());
    let mut x = seat(&game, 0);

    x.connect().unwrap();
    assert!(!x.is_connected());
    assert!(x.moves().call(CLICK_CELL, [json!(4)]));
    assert_eq!(x.sync(), 0);
    assert_eq!(x.get_state().state_id, 1);
}

/// Keeps every outbound message.
struct Recording(Arc<Mutex<Vec<Outbound>>>, bool);

impl Transport<Board> for Recording {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.1 = true;
        Ok(())
    }

    fn send(&mut self, message: Outbound) -> Result<(), TransportError> {
        self.0.lock().unwrap().push(message);
        Ok(())
    }

    fn poll(&mut self) -> Vec<Inbound<Board>> {
        Vec::new()
    }

    fn disconnect(&mut self) {
        self.1 = false;
    }

    fn is_connected(&self) -> bool {
        self.1
    }
}

#[test]
fn test_updates_carry_configured_credentials() {
    let game = Arc::new(tictactoe::game().unwrap());
    let sent = Arc::new(Mutex::new(Vec::new()));
    let config = ClientConfig::default()
        .with_multiplayer(true)
        .with_player(PlayerId::new(0))
        .with_match_id("table-1")
        .with_credentials("x-secret");
    let mut x = Client::new(Arc::clone(&game), config)
        .unwrap()
        .with_transport(Recording(Arc::clone(&sent), false));
    x.connect().unwrap();

    assert!(x.moves().call(CLICK_CELL, [json!(4)]));

    let sent = sent.lock().unwrap();
    assert_eq!(
        *sent,
        [Outbound::Update {
            match_id: "table-1".into(),
            state_id: 0,
            action: Action::make_move(CLICK_CELL, [json!(4)], Some(PlayerId::new(0))),
            credentials: Some("x-secret".into()),
        }]
    );
}

#[test]
fn test_wrong_credentials_are_rolled_back() {
    let game = Arc::new(tictactoe::game().unwrap());
    let master = Master::new(Arc::clone(&game), InMemoryStorage::new()).with_authenticator(
        |_, player, credentials| {
            let expected = player.map(|p| format!("key-{}", p.index()));
            credentials.is_some() && credentials.map(str::to_owned) == expected
        },
    );
    master.create_match("table-1", 2).unwrap();
    let server = LocalServer::new(master);

    let impostor = ClientConfig::default()
        .with_multiplayer(true)
        .with_player(PlayerId::new(0))
        .with_match_id("table-1")
        .with_credentials("key-1");
    let mut x = Client::new(Arc::clone(&game), impostor).unwrap();
    x.connect_with(server.transport("table-1")).unwrap();
    x.sync();

    assert!(x.moves().call(CLICK_CELL, [json!(4)]));
    assert_eq!(x.sync(), 1);
    assert_eq!(x.get_state().g, Board::default());
    assert_eq!(server.master().on_sync("table-1").unwrap().state_id, 0);

    let honest = x.config().clone().with_credentials("key-0");
    let mut x = Client::new(Arc::clone(&game), honest).unwrap();
    x.connect_with(server.transport("table-1")).unwrap();
    x.sync();
    assert!(x.moves().call(CLICK_CELL, [json!(4)]));
    assert_eq!(server.master().on_sync("table-1").unwrap().state_id, 1);
}

#[test]
fn test_raw_transport_round_trip() {
    let game = Arc::new(tictactoe::game().unwrap());
    let server = tictactoe_server(&game);
    let mut transport = server.transport("table-1");
    transport.connect().unwrap();
    transport.poll();

    transport
        .send(Outbound::Update {
            match_id: "table-1".into(),
            state_id: 0,
            action: Action::make_move(CLICK_CELL, [json!(0)], Some(PlayerId::new(0))),
            credentials: None,
        })
        .unwrap();
    transport
        .send(Outbound::Sync {
            match_id: "table-1".into(),
        })
        .unwrap();

    assert_eq!(transport.poll().len(), 2);
}

#[test]
fn test_master_survives_restart_on_flat_files() {
    let dir = tempfile::tempdir().unwrap();
    let game = Arc::new(tictactoe::game().unwrap());
    let click = |cell: u64, p: u8| Action::make_move(CLICK_CELL, [json!(cell)], Some(PlayerId::new(p)));

    {
        let master = Master::new(Arc::clone(&game), FlatFileStorage::new(dir.path()).unwrap());
        master.create_match("persist", 2).unwrap();
        assert!(master.on_update("persist", 0, &click(4, 0), None).unwrap().is_accepted());
        assert!(master.on_update("persist", 1, &click(0, 1), None).unwrap().is_accepted());
    }

    let storage: FlatFileStorage<Board> = FlatFileStorage::new(dir.path()).unwrap();
    assert_eq!(storage.list().unwrap(), ["persist"]);

    let master = Master::new(Arc::clone(&game), storage);
    let state = master.on_sync("persist").unwrap();
    assert_eq!(state.state_id, 2);
    assert_eq!(state.g.cells[0], Some(PlayerId::new(1)));
    assert_eq!(
        master.on_update("persist", 1, &click(8, 0), None).unwrap(),
        UpdateOutcome::Stale { expected: 2 }
    );
}
