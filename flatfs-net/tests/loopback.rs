use std::thread;

use flatfs::io::MemoryDisk;
use flatfs::{FileSys, Volume, BLOCK_SIZE, NUM_BLOCKS};
use flatfs_net::proto::{Command, Status};
use flatfs_net::{Client, Server};

/// Serves `sessions` clients in the background on an ephemeral port.
fn spawn_server(sessions: usize) -> (std::net::SocketAddr, thread::JoinHandle<()>) {
    let server = Server::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut fs = FileSys::mount(Volume::format(MemoryDisk::new(NUM_BLOCKS)).unwrap());
        for _ in 0..sessions {
            server.serve_one(&mut fs).unwrap();
        }
    });
    (addr, handle)
}

fn cmd(line: &str) -> Command {
    Command::parse(line).unwrap()
}

#[test]
fn client_and_server_agree_on_framing() {
    let (addr, server) = spawn_server(1);
    let mut client = Client::connect(addr).unwrap();

    assert_eq!(client.send(&cmd("create f")).unwrap().status, Status::Ok);
    let chunk = "x".repeat(BLOCK_SIZE + 1);
    for _ in 0..3 {
        let response = client
            .send(&Command::Append("f".into(), chunk.clone()))
            .unwrap();
        assert_eq!(response.status, Status::Ok);
    }

    let response = client.send(&cmd("cat f")).unwrap();
    assert_eq!(response.body, chunk.repeat(3).into_bytes());

    let response = client.send(&cmd("head f 5")).unwrap();
    assert_eq!(response.body, b"xxxxx");

    let response = client.send(&cmd("rmdir f")).unwrap();
    assert_eq!(response.status, Status::NotADirectory);
    assert!(response.body.is_empty());

    assert_eq!(client.send(&Command::Quit).unwrap().status, Status::Ok);
    drop(client);
    server.join().unwrap();
}

#[test]
fn listing_with_multiple_lines_survives_the_wire() {
    let (addr, server) = spawn_server(1);
    let mut client = Client::connect(addr).unwrap();

    for line in ["mkdir a", "create b", "mkdir c", "rmdir a"] {
        assert_eq!(client.send(&cmd(line)).unwrap().status, Status::Ok);
    }
    let response = client.send(&cmd("ls")).unwrap();
    assert_eq!(response.body, b"b\nc/\n");

    client.send(&Command::Quit).unwrap();
    server.join().unwrap();
}

#[test]
fn volume_outlives_a_session() {
    let (addr, server) = spawn_server(2);

    let mut first = Client::connect(addr).unwrap();
    first.send(&cmd("mkdir keep")).unwrap();
    first.send(&cmd("cd keep")).unwrap();
    first.disconnect().unwrap();

    // The second client starts back at home and still sees the directory.
    let mut second = Client::connect(addr).unwrap();
    let response = second.send(&cmd("ls")).unwrap();
    assert_eq!(response.body, b"keep/\n");
    second.send(&Command::Quit).unwrap();

    server.join().unwrap();
}
