use crate::input::{outgoing_line, random_setup_line, Phase};
use log::{info, warn};
use shared::ServerMessage;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

pub struct Client {
    stream: TcpStream,
    random_mines: bool,
}

impl Client {
    pub async fn connect(server_addr: &str, random_mines: bool) -> io::Result<Self> {
        let stream = TcpStream::connect(server_addr).await?;
        info!("Connected to {}", server_addr);

        Ok(Client {
            stream,
            random_mines,
        })
    }

    /// Plays one match, reading the player's lines from `input`.
    ///
    /// Returns the message that ended the match, or `None` when the player
    /// quit or the connection was lost first.
    pub async fn run<I>(self, input: I) -> io::Result<Option<ServerMessage>>
    where
        I: AsyncBufRead + Unpin,
    {
        let (read_half, mut write_half) = self.stream.into_split();
        let (message_tx, mut message_rx) = mpsc::unbounded_channel();
        let receiver = tokio::spawn(receive_messages(read_half, message_tx));

        let mut input = input.lines();
        let mut phase = Phase::Setup;

        let outcome = loop {
            tokio::select! {
                message = message_rx.recv() => {
                    let message = match message {
                        Some(message) => message,
                        None => {
                            println!("Connection lost");
                            break None;
                        }
                    };

                    let previous = phase;
                    phase = phase.on_message(&message);

                    if message.ends_session() {
                        break Some(message);
                    }

                    if message == ServerMessage::SetupPrompt && phase == Phase::Setup {
                        if self.random_mines {
                            let line = random_setup_line();
                            println!("Placing mines at {}", line);
                            send_line(&mut write_half, &line).await?;
                            phase = Phase::Waiting;
                        } else {
                            println!("{}", phase.prompt());
                        }
                    } else if phase != previous {
                        println!("{}", phase.prompt());
                    }
                }
                typed = input.next_line() => {
                    let typed = match typed? {
                        Some(typed) => typed,
                        None => {
                            println!("Quitting...");
                            break None;
                        }
                    };
                    if typed.trim().is_empty() {
                        continue;
                    }

                    match outgoing_line(phase, &typed) {
                        Ok(line) => {
                            send_line(&mut write_half, &line).await?;
                            if phase == Phase::Setup {
                                phase = Phase::Waiting;
                            }
                        }
                        Err(e) => println!("{}", e),
                    }
                }
            }
        };

        receiver.abort();
        let _ = write_half.shutdown().await;
        Ok(outcome)
    }
}

async fn send_line(writer: &mut OwnedWriteHalf, line: &str) -> io::Result<()> {
    writer.write_all(format!("{}\n", line).as_bytes()).await?;
    writer.flush().await
}

/// Prints every server line and forwards the ones it understands.
async fn receive_messages(read_half: OwnedReadHalf, message_tx: mpsc::UnboundedSender<ServerMessage>) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                println!("{}", line);

                match line.parse::<ServerMessage>() {
                    Ok(message) => {
                        if message_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error receiving from server: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::parse_target_line;
    use tokio::io::duplex;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one client and runs `script` against it.
    async fn fake_server<F, Fut>(script: F) -> (String, JoinHandle<()>)
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            script(stream).await;
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn test_random_mines_then_victory() {
        let (addr, server) = fake_server(|stream| async move {
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            write_half
                .write_all(b"SET MINES (5 coordinates, e.g. A1 B2):\n")
                .await
                .unwrap();
            let setup = lines.next_line().await.unwrap().unwrap();
            assert!(parse_target_line(&setup).is_ok(), "bad setup {:?}", setup);

            write_half
                .write_all(b"Player-0 READY\nGAME_START\nPlayer-0 VICTORY\n")
                .await
                .unwrap();
        })
        .await;

        let client = Client::connect(&addr, true).await.unwrap();
        let (input, _keyboard) = duplex(64);
        let outcome = client.run(BufReader::new(input)).await.unwrap();

        assert_eq!(
            outcome,
            Some(ServerMessage::Victory {
                player: "Player-0".into()
            })
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_typed_mines_are_validated_and_sent() {
        let (addr, server) = fake_server(|stream| async move {
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            write_half
                .write_all(b"SET MINES (5 coordinates, e.g. A1 B2):\n")
                .await
                .unwrap();
            let setup = lines.next_line().await.unwrap().unwrap();
            assert_eq!(setup, "A1 B2 C3 D4 E5");

            write_half.write_all(b"DEFEAT\n").await.unwrap();
        })
        .await;

        let client = Client::connect(&addr, false).await.unwrap();
        let (input, mut keyboard) = duplex(256);
        // The first line is rejected locally and never reaches the server
        keyboard
            .write_all(b"a1 b2\n\ne5 d4 c3 b2 a1\n")
            .await
            .unwrap();

        let outcome = client.run(BufReader::new(input)).await.unwrap();
        assert_eq!(outcome, Some(ServerMessage::Defeat));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_lost() {
        let (addr, server) = fake_server(|stream| async move {
            drop(stream);
        })
        .await;

        let client = Client::connect(&addr, false).await.unwrap();
        let (input, _keyboard) = duplex(64);
        let outcome = client.run(BufReader::new(input)).await.unwrap();

        assert_eq!(outcome, None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(Client::connect(&addr, false).await.is_err());
    }
}
