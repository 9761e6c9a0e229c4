use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::{StreamExt, stream::BoxStream};
use serde::Serialize;
use tokio::sync::watch;

use super::{cancel_reminder, distinct_stream, first_emission, schedule_reminder};
use crate::{
    draft::DraftStorage,
    dto::checkout::CheckoutSummary,
    error::{AppError, AppResult},
    format::{PhoneFormatter, PriceFormatter},
    models::{CartLine, DeliveryMethod, Order, OrderDraft, PaymentMethod},
    reminder::{ReminderId, ReminderPolicy, ReminderRequest, ReminderScheduler},
    repository::{CartRepository, OrdersRepository},
    services::cart_service::{total_items, total_price},
    subscription::Subscription,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlacementState {
    Idle,
    Placing,
    Placed { order_id: String },
    Failed { message: String, validation: bool },
}

#[derive(Debug, Clone, Default)]
struct CheckoutState {
    draft: OrderDraft,
    cart_lines: Vec<CartLine>,
    cart_emitted: bool,
    can_place_order: bool,
}

impl CheckoutState {
    fn refresh(&mut self) {
        self.can_place_order = can_place_order(&self.draft, &self.cart_lines);
    }
}

/// Pickup needs a non-empty cart; delivery additionally needs an address and
/// a receiver phone.
pub fn can_place_order(draft: &OrderDraft, cart_lines: &[CartLine]) -> bool {
    if cart_lines.is_empty() {
        return false;
    }
    match draft.delivery_method {
        DeliveryMethod::Pickup => true,
        DeliveryMethod::Delivery => {
            has_text(draft.delivery_address.as_deref()) && draft.receiver_phone_e164.is_some()
        }
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

struct PlacementGuard<'a>(&'a AtomicBool);

impl<'a> PlacementGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PlacementGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Dependencies of a [`CheckoutCoordinator`], injected explicitly.
pub struct CheckoutPorts {
    pub cart: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrdersRepository>,
    pub reminders: Arc<dyn ReminderScheduler>,
    pub drafts: Arc<dyn DraftStorage>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub pickup_address: String,
    pub order_status_policy: ReminderPolicy,
    pub prices: PriceFormatter,
    pub phones: PhoneFormatter,
}

/// Checkout form state, order eligibility and the placement pipeline.
///
/// The draft is loaded from [`DraftStorage`] on construction and written
/// back after every field change.
pub struct CheckoutCoordinator {
    owner_id: String,
    ports: CheckoutPorts,
    settings: CheckoutSettings,
    state: Arc<watch::Sender<CheckoutState>>,
    placement: watch::Sender<PlacementState>,
    placing: AtomicBool,
    subscription: Subscription,
}

impl CheckoutCoordinator {
    pub fn new(owner_id: impl Into<String>, ports: CheckoutPorts, settings: CheckoutSettings) -> Self {
        let owner_id = owner_id.into();
        let draft = match ports.drafts.load(&owner_id) {
            Ok(draft) => draft,
            Err(err) => {
                tracing::warn!(error = %err, owner_id = %owner_id, "draft load failed, starting empty");
                OrderDraft::default()
            }
        };

        let (state, _) = watch::channel(CheckoutState {
            draft,
            ..CheckoutState::default()
        });
        let state = Arc::new(state);
        let (placement, _) = watch::channel(PlacementState::Idle);
        let subscription = Subscription::spawn("checkout", follow_cart(ports.cart.observe(), state.clone()));

        Self {
            owner_id,
            ports,
            settings,
            state,
            placement,
            placing: AtomicBool::new(false),
            subscription,
        }
    }

    pub fn draft(&self) -> OrderDraft {
        self.state.borrow().draft.clone()
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        self.state.borrow().draft.delivery_method
    }

    pub fn can_place_order(&self) -> bool {
        self.state.borrow().can_place_order
    }

    /// Emits only when eligibility flips, after the first cart emission.
    pub fn observe_can_place_order(&self) -> BoxStream<'static, bool> {
        distinct_stream(self.state.subscribe(), |state: &CheckoutState| {
            state.cart_emitted.then_some(state.can_place_order)
        })
    }

    pub fn receiver_phone_display(&self) -> Option<String> {
        let phones = &self.settings.phones;
        self.state
            .borrow()
            .draft
            .receiver_phone_e164
            .as_deref()
            .map(|e164| phones.display(e164))
    }

    /// Display form of the receiver phone, re-emitted when the raw value changes.
    pub fn observe_receiver_phone(&self) -> BoxStream<'static, Option<String>> {
        let phones = self.settings.phones.clone();
        distinct_stream(self.state.subscribe(), move |state: &CheckoutState| {
            Some(
                state
                    .draft
                    .receiver_phone_e164
                    .as_deref()
                    .map(|e164| phones.display(e164)),
            )
        })
    }

    pub fn placement_state(&self) -> PlacementState {
        self.placement.borrow().clone()
    }

    pub fn observe_placement(&self) -> BoxStream<'static, PlacementState> {
        distinct_stream(self.placement.subscribe(), |state: &PlacementState| Some(state.clone()))
    }

    pub fn summary(&self) -> CheckoutSummary {
        let state = self.state.borrow();
        CheckoutSummary {
            delivery_method: state.draft.delivery_method,
            payment_method: state.draft.payment_method,
            delivery_address: state.draft.delivery_address.clone(),
            receiver_phone: state
                .draft
                .receiver_phone_e164
                .as_deref()
                .map(|e164| self.settings.phones.display(e164)),
            comment: state.draft.comment.clone(),
            total_items: total_items(&state.cart_lines),
            total_price: self.settings.prices.format(total_price(&state.cart_lines)),
            can_place_order: state.can_place_order,
        }
    }

    pub fn is_following(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn set_delivery_method(&self, method: DeliveryMethod) {
        self.update_draft(|draft| draft.delivery_method = method);
    }

    /// A non-empty address also switches the method to delivery.
    pub fn update_delivery_address(&self, address: &str) {
        let address = address.trim();
        self.update_draft(|draft| {
            if address.is_empty() {
                draft.delivery_address = None;
            } else {
                draft.delivery_address = Some(address.to_string());
                draft.delivery_method = DeliveryMethod::Delivery;
            }
        });
    }

    /// `None` clears the phone.
    pub fn update_receiver_phone(&self, e164: Option<&str>) {
        let phone = e164.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);
        self.update_draft(|draft| draft.receiver_phone_e164 = phone);
    }

    /// Normalizes free-form input; returns false (and clears the phone) when
    /// the input is not a complete number.
    pub fn update_receiver_phone_input(&self, input: &str) -> bool {
        let e164 = self.settings.phones.to_e164(input);
        let valid = e164.is_some();
        self.update_receiver_phone(e164.as_deref());
        valid
    }

    /// Blank input means "no comment"; anything else is kept verbatim.
    pub fn update_comment(&self, comment: &str) {
        let comment = (!comment.trim().is_empty()).then(|| comment.to_string());
        self.update_draft(|draft| draft.comment = comment);
    }

    pub fn set_payment_method(&self, method: PaymentMethod) {
        self.update_draft(|draft| draft.payment_method = method);
    }

    /// Forgets the stored draft, e.g. on logout.
    pub fn reset_draft(&self) {
        if let Err(err) = self.ports.drafts.reset(&self.owner_id) {
            tracing::warn!(error = %err, owner_id = %self.owner_id, "draft reset failed");
        }
        self.state.send_modify(|state| {
            state.draft = OrderDraft::default();
            state.refresh();
        });
    }

    fn update_draft(&self, edit: impl FnOnce(&mut OrderDraft)) {
        let mut saved = None;
        self.state.send_modify(|state| {
            edit(&mut state.draft);
            state.refresh();
            saved = Some(state.draft.clone());
        });
        if let Some(draft) = saved {
            if let Err(err) = self.ports.drafts.save(&self.owner_id, &draft) {
                tracing::warn!(error = %err, owner_id = %self.owner_id, "draft persistence failed");
            }
        }
    }

    /// Validates, snapshots the cart, creates the order, clears the cart and
    /// schedules a status reminder.
    ///
    /// Validation failures happen before any repository call. A failed
    /// `create` leaves the cart untouched and schedules nothing. If the order
    /// is recorded but the clear fails, [`AppError::CartNotCleared`] carries
    /// the order id: retry with [`Self::clear_cart`], not by placing again.
    pub async fn place_order(&self) -> AppResult<Order> {
        let Some(_guard) = PlacementGuard::acquire(&self.placing) else {
            return Err(AppError::PlacementInProgress);
        };
        self.placement.send_replace(PlacementState::Placing);

        let result = self.run_placement().await;
        let next = match &result {
            Ok(order) => PlacementState::Placed {
                order_id: order.id.clone(),
            },
            Err(err) => PlacementState::Failed {
                message: err.to_string(),
                validation: err.is_validation(),
            },
        };
        self.placement.send_replace(next);
        result
    }

    async fn run_placement(&self) -> AppResult<Order> {
        first_emission(&self.state, |state| state.cart_emitted).await;
        let (lines, draft) = {
            let state = self.state.borrow();
            (state.cart_lines.clone(), state.draft.clone())
        };

        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }
        let receive_address = match draft.delivery_method {
            DeliveryMethod::Pickup => self.settings.pickup_address.clone(),
            DeliveryMethod::Delivery => {
                let address = draft
                    .delivery_address
                    .clone()
                    .filter(|a| !a.trim().is_empty());
                let phone_missing = draft.receiver_phone_e164.is_none();
                match address {
                    Some(address) if !phone_missing => address,
                    address => {
                        return Err(AppError::MissingDeliveryFields {
                            address: address.is_none(),
                            phone: phone_missing,
                        });
                    }
                }
            }
        };

        let order = Order::from_cart(&self.owner_id, &lines, receive_address, &draft);
        self.ports.orders.create(order.clone()).await?;
        tracing::info!(
            owner_id = %self.owner_id,
            order_id = %order.id,
            lines = order.lines.len(),
            total_items = order.total_items(),
            "order created"
        );

        if let Err(source) = self.ports.cart.clear().await {
            tracing::error!(error = %source, order_id = %order.id, "order created but cart clear failed");
            return Err(AppError::CartNotCleared {
                order_id: order.id.clone(),
                source,
            });
        }
        self.state.send_modify(|state| {
            state.cart_lines.clear();
            state.refresh();
        });
        cancel_reminder(self.ports.reminders.as_ref(), &ReminderId::cart(&self.owner_id)).await;

        let request = ReminderRequest::new(
            ReminderId::order_status(&order.id),
            "Order received",
            format!(
                "Your order of {} item(s) for {} is being processed",
                order.total_items(),
                self.settings.prices.format(order.total_price())
            ),
            self.settings.order_status_policy.trigger_now(),
        )
        .with_category("order_status")
        .with_payload(serde_json::json!({
            "owner_id": self.owner_id,
            "order_id": order.id,
        }));
        schedule_reminder(self.ports.reminders.as_ref(), request).await;

        Ok(order)
    }

    /// Explicit user clear, independent of placement.
    pub async fn clear_cart(&self) -> AppResult<()> {
        self.ports.cart.clear().await?;
        self.state.send_modify(|state| {
            state.cart_lines.clear();
            state.refresh();
        });
        cancel_reminder(self.ports.reminders.as_ref(), &ReminderId::cart(&self.owner_id)).await;
        tracing::info!(owner_id = %self.owner_id, "cart cleared from checkout");
        Ok(())
    }
}

async fn follow_cart(
    mut emissions: BoxStream<'static, Vec<CartLine>>,
    state: Arc<watch::Sender<CheckoutState>>,
) {
    while let Some(lines) = emissions.next().await {
        state.send_modify(|state| {
            state.cart_lines = lines;
            state.cart_emitted = true;
            state.refresh();
        });
    }
}
