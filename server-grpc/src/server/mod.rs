pub mod health;
pub mod transformers;

use crate::generated::cart_service_server::CartService;
use crate::generated::{AddItemRequest, Cart, Empty, EmptyCartRequest, GetCartRequest};
use cart::ports::CartStore;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::info;
use transformers::{domain_cart_to_grpc, error_to_status};

/// grpc front of the cart store. Holds no state besides the shared store.
#[derive(Clone)]
pub struct CartServer {
    store: Arc<dyn CartStore>,
}

impl CartServer {
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for CartServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartServer").finish_non_exhaustive()
    }
}

#[tonic::async_trait]
impl CartService for CartServer {
    async fn add_item(&self, request: Request<AddItemRequest>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let item = req
            .item
            .ok_or_else(|| Status::invalid_argument("item is required"))?;
        info!(
            "ADD_ITEM: user={} product={} quantity={}",
            req.user_id, item.product_id, item.quantity
        );

        self.store
            .add_item(&req.user_id, &item.product_id, item.quantity)
            .await
            .map_err(error_to_status)?;

        Ok(Response::new(Empty {}))
    }

    async fn get_cart(&self, request: Request<GetCartRequest>) -> Result<Response<Cart>, Status> {
        let req = request.into_inner();
        info!("GET_CART: user={}", req.user_id);

        let cart = self
            .store
            .get_cart(&req.user_id)
            .await
            .map_err(error_to_status)?;

        Ok(Response::new(domain_cart_to_grpc(cart)))
    }

    async fn empty_cart(
        &self,
        request: Request<EmptyCartRequest>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        info!("EMPTY_CART: user={}", req.user_id);

        self.store
            .empty_cart(&req.user_id)
            .await
            .map_err(error_to_status)?;

        Ok(Response::new(Empty {}))
    }
}
