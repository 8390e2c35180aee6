use anyhow::{Context, Result};
use std::env;
use std::net::Ipv4Addr;
use tracing::info;

use rawsend::cli::{help, parse_args, Command, ReceiveOptions, TcpOptions, UdpOptions};
use rawsend::hextools::format_hexdump;
use rawsend::net::packet::{build_tcp_packet, build_udp_packet};
use rawsend::net::raw::{RawReceiver, RawSender};
use rawsend::net::resolve::resolve_ipv4;
use rawsend::net::tcp::TcpSegment;
use rawsend::net::udp::UdpDatagram;

fn resolve_endpoints(source_host: &str, destination_host: &str) -> Result<(Ipv4Addr, Ipv4Addr)> {
    let source = resolve_ipv4(source_host).context("resolving source host")?;
    let destination = resolve_ipv4(destination_host).context("resolving destination host")?;
    info!(%source, %destination, "resolved endpoints");
    Ok((source, destination))
}

fn transmit(datagram: &[u8], destination: Ipv4Addr, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("{} bytes for {}:", datagram.len(), destination);
        print!("{}", format_hexdump(datagram));
        return Ok(());
    }

    info!("sending datagram ({} bytes)", datagram.len());
    let sender = RawSender::open().context("opening raw socket (CAP_NET_RAW required)")?;
    sender.send(datagram, destination).context("sending datagram")?;
    Ok(())
}

fn send_tcp(options: TcpOptions) -> Result<()> {
    let (source, destination) = resolve_endpoints(&options.source_host, &options.destination_host)?;

    let segment = TcpSegment::new(options.source_port, options.destination_port, options.sequence_number)
        .with_ack(options.ack_number)
        .with_window(options.window)
        .with_flags(options.flags)
        .with_payload(options.data);
    let datagram = build_tcp_packet(&source, &destination, &segment).context("building TCP datagram")?;

    transmit(&datagram, destination, options.dry_run)
}

fn send_udp(options: UdpOptions) -> Result<()> {
    let (source, destination) = resolve_endpoints(&options.source_host, &options.destination_host)?;

    let datagram = UdpDatagram::new(options.source_port, options.destination_port, options.data);
    let datagram = build_udp_packet(&source, &destination, &datagram).context("building UDP datagram")?;

    transmit(&datagram, destination, options.dry_run)
}

fn receive(options: ReceiveOptions) -> Result<()> {
    let mut receiver = RawReceiver::open(options.protocol)
        .with_context(|| format!("opening raw socket for protocol {}", options.protocol))?;
    info!(protocol = options.protocol, "waiting for datagrams");

    loop {
        let datagram = receiver.recv().context("receiving datagram")?;
        let header = &datagram.header;

        match datagram.peer {
            Some(peer) => println!("Received datagram from {peer}"),
            None => println!("Received datagram"),
        }
        println!("    {} bytes", header.header_len() + datagram.payload.len());
        println!(
            "    source = {}; destination = {}",
            header.source_address, header.destination_address
        );
        println!(
            "    protocol = {}; header length = {}",
            header.proto,
            header.header_len()
        );
        println!("        data = {}", String::from_utf8_lossy(&datagram.payload));
        println!();
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rawsend=info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program_name = args.first().map(String::as_str).unwrap_or("rawsend");

    match parse_args(args.get(1..).unwrap_or_default())? {
        Command::Help => {
            println!("{}", help(program_name));
            Ok(())
        }
        Command::Tcp(options) => send_tcp(options),
        Command::Udp(options) => send_udp(options),
        Command::Receive(options) => receive(options),
    }
}
