//! Checks SCM_RIGHTS descriptor passing with sendmsg(2)/recvmsg(2) over a
//! unix socketpair: the received descriptor must read the same file content
//! as the one that was sent.

use std::io::{IoSlice, IoSliceMut};
use std::os::fd::AsRawFd;
use std::path::Path;

use libltp::{safe, tst_brk, tst_main, tst_res, TestCase};
use nix::errno::Errno;
use nix::sys::socket::{
    self, AddressFamily, ControlMessage, ControlMessageOwned, MsgFlags, SockFlag, SockType,
    UnixAddr,
};

const DATAFILE: &str = "datafile";
const CONTENT: &[u8] = b"sendmsg01 payload\n";

fn setup() {
    let fd = safe::open(Path::new(DATAFILE), libc::O_CREAT | libc::O_WRONLY, 0o600);
    safe::write_all(fd, CONTENT);
    safe::close(fd);
}

fn verify_sendmsg() {
    let (tx, rx) = match socket::socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::empty(),
    ) {
        Ok(pair) => pair,
        Err(e) => tst_brk!(Brok, "socketpair() failed: {}", e),
    };

    let file_fd = safe::open(Path::new(DATAFILE), libc::O_RDONLY, 0);

    let iov = [IoSlice::new(b"f")];
    let fds = [file_fd];
    let cmsg = [ControlMessage::ScmRights(&fds)];
    if let Err(e) = socket::sendmsg::<UnixAddr>(
        tx.as_raw_fd(),
        &iov,
        &cmsg,
        MsgFlags::empty(),
        None,
    ) {
        tst_brk!(Brok, "sendmsg(SCM_RIGHTS) failed: {}", e);
    }

    let mut buf = [0u8; 1];
    let mut iov = [IoSliceMut::new(&mut buf)];
    let mut cmsg_buf = nix::cmsg_space!([i32; 1]);
    let msg = match socket::recvmsg::<UnixAddr>(
        rx.as_raw_fd(),
        &mut iov,
        Some(&mut cmsg_buf),
        MsgFlags::empty(),
    ) {
        Ok(msg) => msg,
        Err(e) => tst_brk!(Brok, "recvmsg() failed: {}", e),
    };

    let mut received = None;
    let cmsgs = match msg.cmsgs() {
        Ok(iter) => iter,
        Err(e) => tst_brk!(Brok, "decoding control messages failed: {}", e),
    };
    for c in cmsgs {
        if let ControlMessageOwned::ScmRights(fds) = c {
            received = fds.first().copied();
        }
    }

    let Some(recv_fd) = received else {
        tst_res!(Fail, "no SCM_RIGHTS control message received");
        safe::close(file_fd);
        return;
    };
    tst_res!(Pass, "received a descriptor via SCM_RIGHTS");

    let mut data = [0u8; 64];
    let n = Errno::result(unsafe {
        libc::pread(recv_fd, data.as_mut_ptr().cast(), data.len(), 0)
    });
    match n {
        Ok(n) if &data[..n as usize] == CONTENT => {
            tst_res!(Pass, "received descriptor reads the original content");
        }
        Ok(n) => tst_res!(Fail, "received descriptor read {} unexpected bytes", n),
        Err(e) => tst_res!(Fail, "pread() on received descriptor failed: {}", e),
    }

    safe::close(recv_fd);
    safe::close(file_fd);
}

static TEST: TestCase = TestCase {
    setup: Some(setup),
    test_all: Some(verify_sendmsg),
    needs_tmpdir: true,
    ..TestCase::new()
};

tst_main!(TEST);
