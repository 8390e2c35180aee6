pub mod checksum;
pub mod ip;
pub mod packet;
pub mod pseudo;
pub mod raw;
pub mod resolve;
pub mod tcp;
pub mod udp;
