//! Multipart request/reply between two peers on a socket pair.
//!
//! Run with:
//!   cargo run -p batchio --example multipart-peers

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::os::unix::net::UnixStream;
    use std::thread;

    use batchio::multipart::{Message, MultipartStream};

    let (left, right) = UnixStream::pair()?;
    let mut client = MultipartStream::new(left.try_clone()?, left)?;
    let mut server = MultipartStream::new(right.try_clone()?, right)?;

    let server_thread = thread::spawn(
        move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let request = server.read_message()?;
            eprintln!(
                "[server] {} part request, command: {}",
                request.part_count(),
                String::from_utf8_lossy(&request.parts()[0])
            );

            // Echo everything after the command part back.
            let mut reply = Message::new("ok");
            for part in &request.parts()[1..] {
                reply.push(part.clone());
            }
            server.send_message(reply)?;
            server.close()?;
            Ok(())
        },
    );

    let mut request = Message::new("echo");
    request.push("alpha");
    request.push("beta");
    client.send_message(request)?;

    let reply = client.read_message()?;
    for (i, part) in reply.parts().iter().enumerate() {
        eprintln!("[client] part {i}: {}", String::from_utf8_lossy(part));
    }

    server_thread
        .join()
        .expect("server thread should not panic")
        .expect("server should complete without error");
    client.close()?;
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("this example needs unix socket pairs");
}
