use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        checkout::{
            CheckoutSessionCreated, CreateSessionRequest, LineItemSummary, SessionItemRequest,
            SessionSummary, ShippingAddress, ShippingSummary, WebhookAck,
        },
        orders::CreateOrderRequest,
        products::ProductList,
        promos::{PromoValidated, ValidatePromoRequest},
    },
    models::{Address, CheckoutItem, Customer, Product, Promo, PromoKind},
    response::{ErrorBody, OrderAck},
    routes::{checkout, health, orders, params, products, promos},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        promos::validate_promo,
        orders::create_order,
        checkout::create_session,
        checkout::get_session,
        checkout::stripe_webhook
    ),
    components(
        schemas(
            Product,
            ProductList,
            Customer,
            Address,
            CheckoutItem,
            Promo,
            PromoKind,
            CreateOrderRequest,
            OrderAck,
            ErrorBody,
            ValidatePromoRequest,
            PromoValidated,
            SessionItemRequest,
            CreateSessionRequest,
            CheckoutSessionCreated,
            ShippingAddress,
            ShippingSummary,
            LineItemSummary,
            SessionSummary,
            WebhookAck,
            params::ProductQuery,
            health::HealthData
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Promos", description = "Promo code validation"),
        (name = "Orders", description = "Email-notification order intake"),
        (name = "Checkout", description = "Hosted payment sessions and processor webhooks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
