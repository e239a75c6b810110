use crate::generated;
use cart::domain;
use shared::Error;
use tonic::Status;

/// Maps a domain CartItem to a grpc CartItem
pub fn domain_cart_item_to_grpc(item: domain::CartItem) -> generated::CartItem {
    generated::CartItem {
        product_id: item.product_id,
        quantity: item.quantity,
    }
}

/// Maps a domain Cart to a grpc Cart, keeping item order
pub fn domain_cart_to_grpc(cart: domain::Cart) -> generated::Cart {
    generated::Cart {
        user_id: cart.user_id,
        items: cart
            .items
            .into_iter()
            .map(domain_cart_item_to_grpc)
            .collect(),
    }
}

/// Maps a store error to a grpc status.
///
/// Caller mistakes are client errors; outages and corrupt data are server errors.
pub fn error_to_status(err: Error) -> Status {
    match err {
        Error::InvalidArgument(msg) => Status::invalid_argument(msg),
        Error::StoreUnavailable(msg) => Status::unavailable(msg),
        Error::CorruptPayload(msg) => Status::data_loss(msg),
    }
}
