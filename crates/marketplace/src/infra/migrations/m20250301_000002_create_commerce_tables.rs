//! Migration: products, course bundles, purchases, access grants and completion marks.
//!
//! The uniqueness constraints here carry fulfillment idempotency.

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_catalog_tables::{Courses, Lessons, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Description).text().not_null())
                    .col(ColumnDef::new(Products::ImageUrl).string().not_null())
                    .col(ColumnDef::new(Products::PriceInDollars).integer().not_null())
                    .col(
                        ColumnDef::new(Products::Status)
                            .string_len(20)
                            .not_null()
                            .default("private"),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CourseProducts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CourseProducts::CourseId).uuid().not_null())
                    .col(ColumnDef::new(CourseProducts::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(CourseProducts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CourseProducts::CourseId)
                            .col(CourseProducts::ProductId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_products_course")
                            .from(CourseProducts::Table, CourseProducts::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_products_product")
                            .from(CourseProducts::Table, CourseProducts::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Purchases::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Purchases::UserId).uuid().not_null())
                    .col(ColumnDef::new(Purchases::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(Purchases::StripeSessionId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Purchases::PricePaidInCents)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Purchases::ProductName).string().not_null())
                    .col(
                        ColumnDef::new(Purchases::ProductDescription)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::ProductImageUrl)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::RefundedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchases_user")
                            .from(Purchases::Table, Purchases::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchases_product")
                            .from(Purchases::Table, Purchases::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchases_user_created")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .col(Purchases::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserCourseAccess::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserCourseAccess::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserCourseAccess::CourseId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserCourseAccess::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserCourseAccess::UserId)
                            .col(UserCourseAccess::CourseId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_course_access_user")
                            .from(UserCourseAccess::Table, UserCourseAccess::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_course_access_course")
                            .from(UserCourseAccess::Table, UserCourseAccess::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserLessonComplete::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserLessonComplete::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserLessonComplete::LessonId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserLessonComplete::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserLessonComplete::UserId)
                            .col(UserLessonComplete::LessonId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_lesson_complete_user")
                            .from(UserLessonComplete::Table, UserLessonComplete::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_lesson_complete_lesson")
                            .from(UserLessonComplete::Table, UserLessonComplete::LessonId)
                            .to(Lessons::Table, Lessons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserLessonComplete::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserCourseAccess::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CourseProducts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    Name,
    Description,
    ImageUrl,
    PriceInDollars,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CourseProducts {
    Table,
    CourseId,
    ProductId,
    CreatedAt,
}

#[derive(Iden)]
enum Purchases {
    Table,
    Id,
    UserId,
    ProductId,
    StripeSessionId,
    PricePaidInCents,
    ProductName,
    ProductDescription,
    ProductImageUrl,
    CreatedAt,
    UpdatedAt,
    RefundedAt,
}

#[derive(Iden)]
enum UserCourseAccess {
    Table,
    UserId,
    CourseId,
    CreatedAt,
}

#[derive(Iden)]
enum UserLessonComplete {
    Table,
    UserId,
    LessonId,
    CreatedAt,
}
