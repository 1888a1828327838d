use std::fs::File;
use std::io::prelude::*;
use std::io::{stdin, stdout};
use std::{env, process};

use anyhow::{bail, Context, Result};

use sfs::prelude::*;
use sfs::FileSystem;

/// The shell either holds a raw disk or a mounted file system, never both;
/// mounting moves the disk into the file system and unmounting moves it
/// back out.
enum Session {
    Detached(FileDisk),
    Mounted(FileSystem<FileDisk>),
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <diskfile> <nblocks>", args[0]);
        process::exit(1);
    }

    let nblocks: usize = match args[2].parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("Invalid number of blocks {}", args[2]);
            process::exit(1);
        }
    };
    let disk = match FileDisk::open(&args[1], nblocks) {
        Ok(disk) => disk,
        Err(e) => {
            eprintln!("Could not open {}: {}", args[1], e);
            process::exit(1);
        }
    };

    let mut session = Session::Detached(disk);

    loop {
        let line = read_command();
        let command: Vec<&str> = line.split_whitespace().collect();
        if command.is_empty() {
            continue;
        }

        session = match command[0] {
            "help" => {
                do_help();
                session
            }
            "format" => do_format(session),
            "mount" => do_mount(session),
            "unmount" => do_unmount(session),
            "debug" => do_debug(session),
            "create" => do_create(session, &command),
            "remove" => do_remove(session, &command),
            "stat" => do_stat(session, &command),
            "cat" => do_cat(session, &command),
            "copyin" => do_copyin(session, &command),
            "copyout" => do_copyout(session, &command),
            "exit" | "quit" => break,
            _ => {
                println!("Unknown command: {}", line.trim_end());
                session
            }
        };
    }
}

fn read_command() -> String {
    println!();
    print!("sfs> ");
    let _ = stdout().flush();

    let mut line = String::new();
    match stdin().read_line(&mut line) {
        // end of input behaves like quit
        Ok(0) | Err(_) => String::from("exit"),
        Ok(_) => line,
    }
}

fn do_help() {
    println!("Commands are:");
    println!("      format");
    println!("      mount");
    println!("      unmount");
    println!("      debug");
    println!("      create");
    println!("      remove  <inode>");
    println!("      stat    <inode>");
    println!("      cat     <inode>");
    println!("      copyin  <inode> <file>");
    println!("      copyout <inode> <file>");
    println!("      help");
    println!("      quit");
    println!("      exit");
}

fn do_format(session: Session) -> Session {
    match session {
        Session::Detached(mut disk) => {
            if FileSystem::format(&mut disk) {
                println!("disk formatted.");
            } else {
                println!("format failed!");
            }
            Session::Detached(disk)
        }
        mounted => {
            println!("format failed: unmount first");
            mounted
        }
    }
}

fn do_mount(session: Session) -> Session {
    match session {
        Session::Detached(disk) => match FileSystem::mount(disk) {
            Ok(fs) => {
                println!("disk mounted.");
                Session::Mounted(fs)
            }
            Err((disk, e)) => {
                println!("mount failed: {}", e);
                Session::Detached(disk)
            }
        },
        mounted => {
            println!("disk is already mounted");
            mounted
        }
    }
}

fn do_unmount(session: Session) -> Session {
    match session {
        Session::Mounted(fs) => {
            println!("disk unmounted.");
            Session::Detached(fs.unmount())
        }
        detached => {
            println!("no mounted disk");
            detached
        }
    }
}

fn do_debug(mut session: Session) -> Session {
    match &mut session {
        Session::Detached(disk) => FileSystem::debug(disk),
        Session::Mounted(fs) => FileSystem::debug(fs.disk_mut()),
    }
    session
}

fn do_create(mut session: Session, args: &[&str]) -> Session {
    if args.len() != 1 {
        println!("Usage: create");
        return session;
    }
    match &mut session {
        Session::Mounted(fs) => {
            let inumber = fs.create();
            if inumber >= 0 {
                println!("created inode {}", inumber);
            } else {
                println!("create failed!");
            }
        }
        _ => println!("mount the disk first"),
    }
    session
}

fn do_remove(mut session: Session, args: &[&str]) -> Session {
    let inumber = match parse_inumber(args, 2, "Usage: remove <inode>") {
        Some(n) => n,
        None => return session,
    };
    match &mut session {
        Session::Mounted(fs) => {
            if fs.remove(inumber) {
                println!("removed inode {}", inumber);
            } else {
                println!("remove failed!");
            }
        }
        _ => println!("mount the disk first"),
    }
    session
}

fn do_stat(mut session: Session, args: &[&str]) -> Session {
    let inumber = match parse_inumber(args, 2, "Usage: stat <inode>") {
        Some(n) => n,
        None => return session,
    };
    match &mut session {
        Session::Mounted(fs) => {
            let bytes = fs.stat(inumber);
            if bytes >= 0 {
                println!("inode {} has size {} bytes", inumber, bytes);
            } else {
                println!("stat failed!");
            }
        }
        _ => println!("mount the disk first"),
    }
    session
}

fn do_cat(mut session: Session, args: &[&str]) -> Session {
    let inumber = match parse_inumber(args, 2, "Usage: cat <inode>") {
        Some(n) => n,
        None => return session,
    };
    match &mut session {
        Session::Mounted(fs) => {
            if let Err(e) = cat(fs, inumber) {
                println!("cat failed: {:#}", e);
            }
        }
        _ => println!("mount the disk first"),
    }
    session
}

fn do_copyin(mut session: Session, args: &[&str]) -> Session {
    let inumber = match parse_inumber(args, 3, "Usage: copyin <inode> <file>") {
        Some(n) => n,
        None => return session,
    };
    match &mut session {
        Session::Mounted(fs) => match copyin(fs, args[2], inumber) {
            Ok(copied) => println!("{} bytes copied", copied),
            Err(e) => println!("copyin failed: {:#}", e),
        },
        _ => println!("mount the disk first"),
    }
    session
}

fn do_copyout(mut session: Session, args: &[&str]) -> Session {
    let inumber = match parse_inumber(args, 3, "Usage: copyout <inode> <file>") {
        Some(n) => n,
        None => return session,
    };
    match &mut session {
        Session::Mounted(fs) => match copyout(fs, inumber, args[2]) {
            Ok(copied) => println!("{} bytes copied", copied),
            Err(e) => println!("copyout failed: {:#}", e),
        },
        _ => println!("mount the disk first"),
    }
    session
}

fn parse_inumber(args: &[&str], expected_len: usize, usage: &str) -> Option<usize> {
    if args.len() != expected_len {
        println!("{}", usage);
        return None;
    }
    match args[1].parse() {
        Ok(n) => Some(n),
        Err(_) => {
            println!("{}", usage);
            None
        }
    }
}

/// Stream a host file into the given inode, one block at a time. Stops at
/// the first short write and reports how many bytes landed.
fn copyin(fs: &mut FileSystem<FileDisk>, path: &str, inumber: usize) -> Result<usize> {
    let mut file = File::open(path).with_context(|| format!("unable to open {}", path))?;

    let mut buffer = [0u8; BLOCK_SIZE];
    let mut offset = 0;
    loop {
        let got = file.read(&mut buffer).context("read failed")?;
        if got == 0 {
            break;
        }

        let actual = fs.write(inumber, &buffer, got, offset);
        if actual < 0 {
            bail!("fs.write returned invalid result {}", actual);
        }
        offset += actual as usize;
        if (actual as usize) != got {
            println!("fs.write only wrote {} bytes, not {} bytes", actual, got);
            break;
        }
    }
    Ok(offset)
}

/// Stream the given inode into a host file, one block at a time.
fn copyout(fs: &mut FileSystem<FileDisk>, inumber: usize, path: &str) -> Result<usize> {
    let mut file = File::create(path).with_context(|| format!("unable to open {}", path))?;

    let mut buffer = [0u8; BLOCK_SIZE];
    let mut offset = 0;
    loop {
        let got = fs.read(inumber, &mut buffer, BLOCK_SIZE, offset);
        if got < 0 {
            bail!("fs.read returned invalid result {}", got);
        }
        if got == 0 {
            break;
        }
        file.write_all(&buffer[..got as usize]).context("write failed")?;
        offset += got as usize;
    }
    Ok(offset)
}

fn cat(fs: &mut FileSystem<FileDisk>, inumber: usize) -> Result<()> {
    let mut buffer = [0u8; BLOCK_SIZE];
    let mut offset = 0;
    loop {
        let got = fs.read(inumber, &mut buffer, BLOCK_SIZE, offset);
        if got < 0 {
            bail!("fs.read returned invalid result {}", got);
        }
        if got == 0 {
            break;
        }
        print!("{}", String::from_utf8_lossy(&buffer[..got as usize]));
        offset += got as usize;
    }
    let _ = stdout().flush();
    Ok(())
}
