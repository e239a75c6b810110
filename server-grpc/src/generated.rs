#![allow(dead_code)]

tonic::include_proto!("cart.v1");

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("cart_descriptor");
