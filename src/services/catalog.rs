use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::ticket::{Removal, TicketAvailability};
use crate::models::{
    NewTicketType, OrderStatus, TicketFilter, TicketStatus, TicketType, TicketTypeChanges,
};
use crate::services::availability::{display_available, remaining_for};
use crate::services::clock::Clock;
use crate::services::validation::{
    parse_bookable_date, validate_capacity, validate_price, validate_ticket_name, Pagination,
};
use crate::store::{AttractionLookup, OrderStore, Store, TicketStore};
use crate::utils::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct CreateTicketRequest {
    pub attraction_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(alias = "available", alias = "capacity")]
    pub daily_capacity: Option<i64>,
    #[serde(alias = "price")]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    #[serde(alias = "ticket_id")]
    pub id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(alias = "available", alias = "capacity")]
    pub daily_capacity: Option<i64>,
    #[serde(alias = "price")]
    pub unit_price: Option<Decimal>,
    pub status: Option<String>,
}

impl UpdateTicketRequest {
    fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.daily_capacity.is_some()
            || self.unit_price.is_some()
            || self.status.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteTicketRequest {
    #[serde(alias = "ticket_id")]
    pub id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub attraction_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<i64>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckTicketRequest {
    pub ticket_id: Option<Uuid>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketPage {
    pub total: i64,
    pub tickets: Vec<TicketType>,
    pub page: i64,
    pub page_size: i64,
}

/// Ticket types per attraction: creation, edits, retirement and
/// per-date availability.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_ticket_type(&self, req: CreateTicketRequest) -> Result<TicketType, AppError> {
        let attraction_id = req.attraction_id.ok_or(AppError::MissingField("attraction_id"))?;
        let name = req.name.ok_or(AppError::MissingField("name"))?;
        let capacity = req.daily_capacity.ok_or(AppError::MissingField("daily_capacity"))?;
        let price = req.unit_price.ok_or(AppError::MissingField("unit_price"))?;

        let draft = NewTicketType {
            attraction_id,
            name: validate_ticket_name(&name)?,
            daily_capacity: validate_capacity(capacity)?,
            unit_price: validate_price(price)?,
        };

        if self.store.get_attraction(attraction_id).await?.is_none() {
            return Err(AppError::validation(
                "attraction_id",
                "The attraction does not exist",
            ));
        }

        if self
            .store
            .find_ticket_by_name(attraction_id, &draft.name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Ticket type '{}' already exists for this attraction",
                draft.name
            )));
        }

        let ticket = self.store.insert_ticket(&draft.into_ticket()).await?;
        info!(
            ticket_id = %ticket.id,
            attraction_id = %ticket.attraction_id,
            name = %ticket.name,
            daily_capacity = ticket.daily_capacity,
            unit_price = %ticket.unit_price,
            "Ticket type created"
        );
        Ok(ticket)
    }

    pub async fn update_ticket_type(&self, req: UpdateTicketRequest) -> Result<TicketType, AppError> {
        let id = req.id.ok_or(AppError::MissingField("id"))?;
        if !req.has_changes() {
            return Err(AppError::validation(
                "fields",
                "At least one of name, daily_capacity, unit_price or status must be provided",
            ));
        }

        let mut ticket = self
            .store
            .get_ticket(id)
            .await?
            .ok_or(AppError::TicketNotFound)?;

        let changes = TicketTypeChanges {
            name: req.name.as_deref().map(validate_ticket_name).transpose()?,
            daily_capacity: req.daily_capacity.map(validate_capacity).transpose()?,
            unit_price: req.unit_price.map(validate_price).transpose()?,
            status: req
                .status
                .as_deref()
                .map(str::parse::<TicketStatus>)
                .transpose()?,
        };

        if let Some(name) = changes.name.as_deref() {
            if name != ticket.name {
                if let Some(existing) = self
                    .store
                    .find_ticket_by_name(ticket.attraction_id, name)
                    .await?
                {
                    if existing.id != ticket.id {
                        return Err(AppError::Conflict(format!(
                            "Ticket type '{name}' already exists for this attraction"
                        )));
                    }
                }
            }
        }

        changes.apply(&mut ticket);
        let ticket = self.store.update_ticket(&ticket).await?;
        info!(ticket_id = %ticket.id, status = %ticket.status, "Ticket type updated");
        Ok(ticket)
    }

    /// Removes a ticket type, or only marks it inactive while orders still
    /// reference it.
    pub async fn retire_or_delete(&self, req: DeleteTicketRequest) -> Result<Removal, AppError> {
        let id = req.id.ok_or(AppError::MissingField("id"))?;
        let mut ticket = self
            .store
            .get_ticket(id)
            .await?
            .ok_or(AppError::TicketNotFound)?;

        let live = self
            .store
            .count_ticket_orders(id, Some(OrderStatus::Success))
            .await?;
        let referenced = live > 0 || self.store.count_ticket_orders(id, None).await? > 0;

        if referenced {
            if ticket.is_active() {
                TicketTypeChanges {
                    status: Some(TicketStatus::Inactive),
                    ..Default::default()
                }
                .apply(&mut ticket);
                ticket = self.store.update_ticket(&ticket).await?;
            }
            info!(ticket_id = %id, live_orders = live, "Ticket type retired instead of deleted");
            return Ok(Removal::Retired { ticket });
        }

        if !self.store.delete_ticket(id).await? {
            return Err(AppError::TicketNotFound);
        }
        info!(ticket_id = %id, "Ticket type deleted");
        Ok(Removal::Deleted { id })
    }

    pub async fn list_ticket_types(&self, query: TicketQuery) -> Result<TicketPage, AppError> {
        let page = Pagination::new(query.page, query.page_size)?;
        let filter = TicketFilter {
            attraction_id: query.attraction_id,
            status: query
                .status
                .as_deref()
                .map(str::parse::<TicketStatus>)
                .transpose()?,
        };

        let (total, tickets) = self.store.list_tickets(&filter, page).await?;
        Ok(TicketPage {
            total,
            tickets,
            page: page.page,
            page_size: page.page_size,
        })
    }

    pub async fn check_availability(
        &self,
        req: CheckTicketRequest,
    ) -> Result<TicketAvailability, AppError> {
        let ticket_id = req.ticket_id.ok_or(AppError::MissingField("ticket_id"))?;
        let raw_date = req.date.ok_or(AppError::MissingField("date"))?;
        let date = parse_bookable_date(&raw_date, self.clock.today())?;

        let ticket = self
            .store
            .get_ticket(ticket_id)
            .await?
            .ok_or(AppError::TicketNotFound)?;
        let left = remaining_for(self.store.as_ref(), ticket_id, date, None).await?;

        Ok(TicketAvailability {
            id: ticket.id,
            attraction_id: ticket.attraction_id,
            name: ticket.name,
            available: display_available(left),
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attraction, NewOrder};
    use crate::services::clock::FixedClock;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    async fn setup() -> (Arc<MemoryStore>, CatalogService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let attraction = store.add_attraction(Attraction::new("Old Town")).await;
        let catalog = CatalogService::new(store.clone(), Arc::new(FixedClock(today())));
        (store, catalog, attraction.id)
    }

    fn create(attraction_id: Uuid, name: &str) -> CreateTicketRequest {
        CreateTicketRequest {
            attraction_id: Some(attraction_id),
            name: Some(name.to_string()),
            daily_capacity: Some(10),
            unit_price: Some(Decimal::new(2500, 2)),
        }
    }

    #[tokio::test]
    async fn test_create_returns_active_ticket() {
        let (_, catalog, attraction_id) = setup().await;
        let ticket = catalog.create_ticket_type(create(attraction_id, "Adult")).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Active);
        assert_eq!(ticket.daily_capacity, 10);
    }

    #[tokio::test]
    async fn test_create_validation_failures() {
        let (_, catalog, attraction_id) = setup().await;

        let unknown = catalog.create_ticket_type(create(Uuid::new_v4(), "Adult")).await;
        assert!(matches!(unknown, Err(AppError::ValidationError { field: "attraction_id", .. })));

        let blank = catalog.create_ticket_type(create(attraction_id, "  ")).await;
        assert!(matches!(blank, Err(AppError::ValidationError { field: "name", .. })));

        let long = catalog
            .create_ticket_type(create(attraction_id, &"n".repeat(101)))
            .await;
        assert!(long.is_err());

        let mut negative = create(attraction_id, "Child");
        negative.daily_capacity = Some(-1);
        assert!(catalog.create_ticket_type(negative).await.is_err());

        let mut cheap = create(attraction_id, "Child");
        cheap.unit_price = Some(Decimal::new(-100, 2));
        assert!(catalog.create_ticket_type(cheap).await.is_err());

        let missing = CreateTicketRequest {
            attraction_id: Some(attraction_id),
            ..Default::default()
        };
        assert!(matches!(
            catalog.create_ticket_type(missing).await,
            Err(AppError::MissingField("name"))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let (_, catalog, attraction_id) = setup().await;
        catalog.create_ticket_type(create(attraction_id, "Adult")).await.unwrap();
        let err = catalog
            .create_ticket_type(create(attraction_id, "Adult"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 1002);
    }

    #[tokio::test]
    async fn test_update_rename_collision_and_noop() {
        let (_, catalog, attraction_id) = setup().await;
        let adult = catalog.create_ticket_type(create(attraction_id, "Adult")).await.unwrap();
        catalog.create_ticket_type(create(attraction_id, "Child")).await.unwrap();

        let clash = catalog
            .update_ticket_type(UpdateTicketRequest {
                id: Some(adult.id),
                name: Some("Child".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let same = catalog
            .update_ticket_type(UpdateTicketRequest {
                id: Some(adult.id),
                name: Some("Adult".into()),
                unit_price: Some(Decimal::new(3000, 2)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(same.name, "Adult");
        assert_eq!(same.unit_price, Decimal::new(3000, 2));
        assert_eq!(same.daily_capacity, 10);
    }

    #[tokio::test]
    async fn test_update_requires_fields_and_known_id() {
        let (_, catalog, _) = setup().await;
        let empty = catalog
            .update_ticket_type(UpdateTicketRequest {
                id: Some(Uuid::new_v4()),
                ..Default::default()
            })
            .await;
        assert!(matches!(empty, Err(AppError::ValidationError { field: "fields", .. })));

        let unknown = catalog
            .update_ticket_type(UpdateTicketRequest {
                id: Some(Uuid::new_v4()),
                daily_capacity: Some(3),
                ..Default::default()
            })
            .await;
        assert!(matches!(unknown, Err(AppError::TicketNotFound)));

        let unknown_with_bad_field = catalog
            .update_ticket_type(UpdateTicketRequest {
                id: Some(Uuid::new_v4()),
                daily_capacity: Some(-5),
                ..Default::default()
            })
            .await;
        assert!(matches!(unknown_with_bad_field, Err(AppError::TicketNotFound)));
    }

    #[tokio::test]
    async fn test_retire_when_only_cancelled_orders_reference_it() {
        let (store, catalog, attraction_id) = setup().await;
        let ticket = catalog.create_ticket_type(create(attraction_id, "Adult")).await.unwrap();
        let mut order = store
            .commit_new(
                NewOrder {
                    user_id: Uuid::new_v4(),
                    ticket_id: ticket.id,
                    quantity: 1,
                    date: today(),
                    total_price: Decimal::new(2500, 2),
                },
                ticket.daily_capacity,
            )
            .await
            .unwrap();
        order.status = OrderStatus::Cancelled;
        store.commit_update(order, None).await.unwrap();

        let removal = catalog
            .retire_or_delete(DeleteTicketRequest { id: Some(ticket.id) })
            .await
            .unwrap();
        assert!(matches!(
            removal,
            Removal::Retired { ticket } if ticket.status == TicketStatus::Inactive
        ));
        assert!(store.get_ticket(ticket.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_sub_cent_and_oversized_prices() {
        let (_, catalog, attraction_id) = setup().await;

        let mut fractional = create(attraction_id, "Adult");
        fractional.unit_price = Some(Decimal::new(10005, 3));
        assert!(matches!(
            catalog.create_ticket_type(fractional).await,
            Err(AppError::ValidationError { field: "unit_price", .. })
        ));

        let mut huge = create(attraction_id, "Adult");
        huge.unit_price = Some(Decimal::MAX);
        assert!(catalog.create_ticket_type(huge).await.is_err());

        let mut tidy = create(attraction_id, "Adult");
        tidy.unit_price = Some(Decimal::new(105, 1));
        let ticket = catalog.create_ticket_type(tidy).await.unwrap();
        assert_eq!(ticket.unit_price.to_string(), "10.50");
    }

    #[tokio::test]
    async fn test_retire_when_referenced_delete_otherwise() {
        let (store, catalog, attraction_id) = setup().await;
        let sold = catalog.create_ticket_type(create(attraction_id, "Adult")).await.unwrap();
        let unsold = catalog.create_ticket_type(create(attraction_id, "Child")).await.unwrap();

        store
            .commit_new(
                NewOrder {
                    user_id: Uuid::new_v4(),
                    ticket_id: sold.id,
                    quantity: 1,
                    date: today(),
                    total_price: Decimal::new(2500, 2),
                },
                sold.daily_capacity,
            )
            .await
            .unwrap();

        let retired = catalog
            .retire_or_delete(DeleteTicketRequest { id: Some(sold.id) })
            .await
            .unwrap();
        match retired {
            Removal::Retired { ticket } => assert_eq!(ticket.status, TicketStatus::Inactive),
            Removal::Deleted { .. } => panic!("referenced ticket must not be deleted"),
        }

        let deleted = catalog
            .retire_or_delete(DeleteTicketRequest { id: Some(unsold.id) })
            .await
            .unwrap();
        assert!(matches!(deleted, Removal::Deleted { id } if id == unsold.id));
        assert!(store.get_ticket(unsold.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_availability_clamps_and_validates() {
        let (store, catalog, attraction_id) = setup().await;
        let ticket = catalog.create_ticket_type(create(attraction_id, "Adult")).await.unwrap();
        store
            .commit_new(
                NewOrder {
                    user_id: Uuid::new_v4(),
                    ticket_id: ticket.id,
                    quantity: 4,
                    date: today(),
                    total_price: Decimal::new(10000, 2),
                },
                ticket.daily_capacity,
            )
            .await
            .unwrap();

        let check = catalog
            .check_availability(CheckTicketRequest {
                ticket_id: Some(ticket.id),
                date: Some("2026-06-01".into()),
            })
            .await
            .unwrap();
        assert_eq!(check.available, 6);

        catalog
            .update_ticket_type(UpdateTicketRequest {
                id: Some(ticket.id),
                daily_capacity: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        let oversold = catalog
            .check_availability(CheckTicketRequest {
                ticket_id: Some(ticket.id),
                date: Some("2026-06-01".into()),
            })
            .await
            .unwrap();
        assert_eq!(oversold.available, 0);

        let past = catalog
            .check_availability(CheckTicketRequest {
                ticket_id: Some(ticket.id),
                date: Some("2026-05-31".into()),
            })
            .await;
        assert!(matches!(past, Err(AppError::PastDate)));
    }

    #[tokio::test]
    async fn test_list_filters_by_attraction() {
        let (store, catalog, attraction_id) = setup().await;
        let other = store.add_attraction(Attraction::new("Harbour")).await;
        catalog.create_ticket_type(create(attraction_id, "Adult")).await.unwrap();
        catalog.create_ticket_type(create(attraction_id, "Child")).await.unwrap();
        catalog.create_ticket_type(create(other.id, "Adult")).await.unwrap();

        let page = catalog
            .list_ticket_types(TicketQuery {
                attraction_id: Some(attraction_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.tickets[0].name, "Adult");
        assert_eq!(page.tickets[1].name, "Child");
    }
}
