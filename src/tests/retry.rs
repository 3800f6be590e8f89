use futures_util::io::Cursor;
use futures_util::join;
use std::time::Duration;

use super::*;
use crate::client::TftpClient;
use crate::error::Error;
use crate::io::Mode;
use crate::packet::{Packet, RwReq};
use crate::utils::io_timeout;

// An unanswered request is retransmitted byte for byte until the send
// budget runs out, then the transfer fails.
#[test]
fn client_retransmits_wrq_then_gives_up() {
    with_executor(|_ex| async move {
        let server = bind_localhost();
        let addr = server.get_ref().local_addr().unwrap();

        let client = TftpClient::new(addr)
            .retry_timeout(Duration::from_millis(100))
            .max_retries(3);

        let client_fut =
            client.put("file.bin", Mode::Octet, Cursor::new(vec![1, 2, 3]));

        let recv_fut = async {
            let first = recv_raw(&server).await;
            let second = recv_raw(&server).await;
            let third = recv_raw(&server).await;
            (first, second, third)
        };

        let (res, (first, second, third)) = join!(client_fut, recv_fut);

        let wrq = Packet::Wrq(RwReq {
            filename: "file.bin".to_string(),
            mode: "octet".to_string(),
            opts: Vec::new(),
        })
        .to_bytes();
        assert_eq!(first, wrq.to_vec());
        assert_eq!(second, first);
        assert_eq!(third, first);

        match res {
            Err(Error::NoResponse(target, sends)) => {
                assert_eq!(target, addr);
                assert_eq!(sends, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    });
}

// A send budget of zero is treated as one: the request goes out exactly
// once and the transfer fails cleanly instead of looping or panicking.
#[test]
fn zero_send_budget_still_sends_once() {
    with_executor(|_ex| async move {
        let server = bind_localhost();
        let addr = server.get_ref().local_addr().unwrap();

        let client = TftpClient::new(addr)
            .retry_timeout(Duration::from_millis(100))
            .max_retries(0);

        let client_fut =
            client.put("file.bin", Mode::Octet, Cursor::new(vec![1, 2, 3]));

        let recv_fut = async {
            let first = recv_raw(&server).await;

            // No retransmission follows.
            let mut buf = [0u8; MAX_PACKET_SIZE];
            let silence = io_timeout(
                Duration::from_millis(300),
                server.recv_from(&mut buf),
            )
            .await;

            (first, silence.is_err())
        };

        let (res, (first, quiet)) = join!(client_fut, recv_fut);

        let wrq = Packet::Wrq(RwReq {
            filename: "file.bin".to_string(),
            mode: "octet".to_string(),
            opts: Vec::new(),
        })
        .to_bytes();
        assert_eq!(first, wrq.to_vec());
        assert!(quiet);

        match res {
            Err(Error::NoResponse(target, sends)) => {
                assert_eq!(target, addr);
                assert_eq!(sends, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    });
}

#[test]
fn server_retransmits_data_then_goes_quiet() {
    with_executor(|ex| async move {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "f", b"hello");
        let addr =
            start_server(&ex, dir.path(), Duration::from_millis(100), 2)
                .await;

        let socket = bind_localhost();
        let rrq = Packet::Rrq(RwReq {
            filename: "f".to_string(),
            mode: "octet".to_string(),
            opts: Vec::new(),
        })
        .to_bytes();
        socket.send_to(&rrq, addr).await.unwrap();

        let first = recv_raw(&socket).await;
        assert_eq!(
            first,
            Packet::Data(1, b"hello".to_vec()).to_bytes().to_vec()
        );

        // Unacknowledged, so the same bytes come again.
        let second = recv_raw(&socket).await;
        assert_eq!(second, first);

        // Budget spent, the server stays silent.
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let res = io_timeout(
            Duration::from_millis(500),
            socket.recv_from(&mut buf),
        )
        .await;
        assert!(res.is_err());
    });
}

// Datagrams that fail to decode are dropped without killing the transfer.
#[test]
fn bad_datagrams_do_not_abort_transfer() {
    with_executor(|ex| async move {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "f", b"payload");
        let addr =
            start_server(&ex, dir.path(), Duration::from_secs(1), 5).await;

        let socket = bind_localhost();
        let rrq = Packet::Rrq(RwReq {
            filename: "f".to_string(),
            mode: "octet".to_string(),
            opts: Vec::new(),
        })
        .to_bytes();
        socket.send_to(&rrq, addr).await.unwrap();

        let (packet, from) = recv_packet(&socket).await;
        assert!(matches!(packet, Packet::Data(1, _)));

        socket.send_to(b"\xff\xffgarbage", from).await.unwrap();
        socket.send_to(&Packet::Ack(1).to_bytes(), from).await.unwrap();

        // The transfer completed despite the garbage in between; the file
        // fits one block so there is nothing more to receive.
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let res = io_timeout(
            Duration::from_millis(300),
            socket.recv_from(&mut buf),
        )
        .await;
        assert!(res.is_err());
    });
}
