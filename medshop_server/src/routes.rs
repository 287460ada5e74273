//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every storage call in the engine is async, so handlers must only
//! ever `.await` them and never block.
//!
//! Routes under `/api` sit behind the JWT middleware and receive the caller's [`JwtClaims`]. Admin routes are further
//! wrapped in the ACL middleware.
use actix_web::{get, http::StatusCode, web, HttpResponse, Responder};
use log::*;
use medshop_engine::{
    db_types::{MedicineUpdate, NewMedicine, Role},
    order_objects::{DirectOrder, MedicineQuery, OrderQueryFilter, PaymentConfirmation},
    traits::{CartManagement, CatalogManagement, OrderManagement, ShopDatabase},
    CartApi,
    CatalogApi,
    OrderApi,
    PaymentSessionProvider,
    SettlementApi,
};

use crate::{
    auth::JwtClaims,
    data_objects::{
        AddToCartParams,
        AdminOrderQuery,
        CheckoutParams,
        JsonResponse,
        SettlementResult,
        UpdateQuantityParams,
        UpdateStatusParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($param:ident: $bound:path),+ $(where requires [$($roles:expr),+])?) => {
        paste::paste! {
            pub struct [<$name:camel Route>]<$($param),+>(core::marker::PhantomData<fn() -> ($($param,)+)>);

            impl<$($param),+> [<$name:camel Route>]<$($param),+> {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    Self(core::marker::PhantomData)
                }
            }

            impl<$($param),+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$($param),+>
            where
                $($param: $bound + 'static,)+
            {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name::<$($param),+>);
                    $(let res = res.wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));)?
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(search_medicines => Get "/medicines" impl B: CatalogManagement);
/// Route handler for the catalog listing
///
/// Anyone can browse the catalog. `search` is a case-insensitive match on the medicine name, and `page` starts at 1.
pub async fn search_medicines<B: CatalogManagement>(
    query: web::Query<MedicineQuery>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    debug!("💻️ GET medicines. search: {:?}, page: {}", query.search_term(), query.page());
    let page = api.search(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(medicine_by_id => Get "/medicines/{id}" impl B: CatalogManagement);
pub async fn medicine_by_id<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET medicine #{id}");
    let medicine = api.medicine(id).await?;
    Ok(HttpResponse::Ok().json(medicine))
}

route!(add_medicine => Post "/admin/medicines" impl B: CatalogManagement where requires [Role::Admin]);
pub async fn add_medicine<B: CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<NewMedicine>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let medicine = body.into_inner();
    debug!("💻️ POST new medicine '{}' by {}", medicine.name, claims.sub);
    let medicine = api.add_medicine(medicine).await?;
    Ok(HttpResponse::Created().json(medicine))
}

route!(update_medicine => Put "/admin/medicines/{id}" impl B: CatalogManagement where requires [Role::Admin]);
/// Route handler for catalog edits
///
/// Fields left out of the body are unchanged. Stock is changed with `stock_adjustment`, a signed delta, so that an
/// admin edit can never overwrite units taken by a concurrent checkout.
pub async fn update_medicine<B: CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<MedicineUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT medicine #{id} by {}", claims.sub);
    let medicine = api.update_medicine(id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(medicine))
}

route!(delete_medicine => Delete "/admin/medicines/{id}" impl B: CatalogManagement where requires [Role::Admin]);
pub async fn delete_medicine<B: CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE medicine #{id} by {}", claims.sub);
    api.delete_medicine(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Medicine {id} deleted"))))
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl B: CartManagement);
pub async fn my_cart<B: CartManagement>(
    claims: JwtClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cart for {}", claims.sub);
    let cart = api.cart(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_to_cart => Post "/cart/add" impl B: CartManagement);
/// Route handler for adding to the cart
///
/// Adding a medicine that is already in the cart adds to the existing line's quantity. The response is `201 Created`
/// for a new line and `200 OK` for an existing one.
pub async fn add_to_cart<B: CartManagement>(
    claims: JwtClaims,
    body: web::Json<AddToCartParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddToCartParams { medicine_id, quantity } = body.into_inner();
    debug!("💻️ POST {quantity} of medicine #{medicine_id} to cart of {}", claims.sub);
    let (line, created) = api.add_to_cart(&claims.sub, medicine_id, quantity).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok(HttpResponse::build(status).json(line))
}

route!(update_cart_item => Put "/cart/items/{medicine_id}" impl B: CartManagement);
pub async fn update_cart_item<B: CartManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<UpdateQuantityParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let medicine_id = path.into_inner();
    let quantity = body.into_inner().quantity;
    debug!("💻️ PUT quantity {quantity} of medicine #{medicine_id} in cart of {}", claims.sub);
    let line = api.update_quantity(&claims.sub, medicine_id, quantity).await?;
    Ok(HttpResponse::Ok().json(line))
}

route!(remove_from_cart => Delete "/cart/remove/{medicine_id}" impl B: CartManagement);
pub async fn remove_from_cart<B: CartManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let medicine_id = path.into_inner();
    debug!("💻️ DELETE medicine #{medicine_id} from cart of {}", claims.sub);
    api.remove_from_cart(&claims.sub, medicine_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Item removed from cart")))
}

route!(checkout => Post "/cart/checkout" impl B: ShopDatabase, G: PaymentSessionProvider);
/// Route handler for the cash-on-delivery checkout
///
/// Every line in the cart is confirmed, or none is. On success the cart is empty and the confirmed orders are
/// returned; on failure the cart and stock are unchanged.
pub async fn checkout<B: ShopDatabase, G: PaymentSessionProvider>(
    claims: JwtClaims,
    body: web::Json<CheckoutParams>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let CheckoutParams { address, prescription } = body.into_inner();
    debug!("💻️ POST cash on delivery checkout for {}", claims.sub);
    let orders = api.checkout_cash_on_delivery(&claims.sub, &address, prescription.as_deref()).await?;
    let message = format!("Order placed successfully. {} items will be paid for on delivery", orders.len());
    Ok(HttpResponse::Ok().json(SettlementResult::new(message, orders)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(direct_order => Post "/orders" impl B: ShopDatabase, G: PaymentSessionProvider);
/// Route handler for "buy now"
///
/// A cash-on-delivery order is settled immediately. An online order is put in the cart, to be paid for through
/// `/payment/reserve` and `/payment/confirm`.
pub async fn direct_order<B: ShopDatabase, G: PaymentSessionProvider>(
    claims: JwtClaims,
    body: web::Json<DirectOrder>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner();
    debug!("💻️ POST direct order of {} x medicine #{} by {}", order.quantity, order.medicine_id, claims.sub);
    let order = api.place_direct_order(&claims.sub, order).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders/my" impl B: OrderManagement);
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", claims.sub);
    let orders = api.orders_for_user(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(reserve_payment => Post "/payment/reserve" impl B: ShopDatabase, G: PaymentSessionProvider);
/// Route handler for opening an online payment
///
/// The gateway is asked for a payment session covering the whole cart, and every cart line is stamped with the
/// session id. The client hands the session to the gateway checkout and calls `/payment/confirm` afterwards.
pub async fn reserve_payment<B: ShopDatabase, G: PaymentSessionProvider>(
    claims: JwtClaims,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST payment reservation for {}", claims.sub);
    let reservation = api.reserve_payment(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(reservation))
}

route!(confirm_payment => Post "/payment/confirm" impl B: ShopDatabase, G: PaymentSessionProvider);
pub async fn confirm_payment<B: ShopDatabase, G: PaymentSessionProvider>(
    claims: JwtClaims,
    body: web::Json<PaymentConfirmation>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let confirmation = body.into_inner();
    debug!("💻️ POST payment confirmation for session {} by {}", confirmation.session_id, claims.sub);
    let orders = api.confirm_payment(&claims.sub, confirmation).await?;
    let message = format!("Payment verified. {} orders paid", orders.len());
    Ok(HttpResponse::Ok().json(SettlementResult::new(message, orders)))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(all_orders => Get "/admin/orders" impl B: ShopDatabase, G: PaymentSessionProvider where requires [Role::Admin]);
pub async fn all_orders<B: ShopDatabase, G: PaymentSessionProvider>(
    query: web::Query<AdminOrderQuery>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let AdminOrderQuery { status, payment_status, user_id } = query.into_inner();
    let mut filter = OrderQueryFilter::default();
    if let Some(status) = status {
        filter = filter.with_status(status);
    }
    if let Some(status) = payment_status {
        filter = filter.with_payment_status(status);
    }
    if let Some(user_id) = user_id {
        filter = filter.with_user_id(&user_id);
    }
    debug!("💻️ GET all orders. {filter}");
    let orders = api.all_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_order_status => Put "/admin/orders/{id}" impl B: ShopDatabase, G: PaymentSessionProvider where requires [Role::Admin]);
/// Route handler for admin status changes
///
/// Orders move `Processing -> Shipped -> Delivered`, or from `Processing` to `Cancelled`, which returns the units to
/// stock. Any other change is a 400.
pub async fn update_order_status<B: ShopDatabase, G: PaymentSessionProvider>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusParams>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let status = body.into_inner().status;
    info!("💻️ PUT order #{id} to {status} by {}", claims.sub);
    let order = api.update_order_status(id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}
