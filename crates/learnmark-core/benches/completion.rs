use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use learnmark_core::course::{Course, CourseModule, Lesson};
use learnmark_core::criteria::CompletionCriterion;
use learnmark_core::model::LessonType;
use learnmark_core::ordering::{Ordered, OrderedCollection};
use uuid::Uuid;

fn make_course(modules: usize, lessons_per_module: usize) -> Course {
    let mut course = Course::new("bench", Uuid::new_v4()).unwrap();
    for m in 0..modules {
        let module = CourseModule::new(format!("module {m}")).unwrap();
        let module_id = module.id();
        course.add_module(module).unwrap();
        for l in 0..lessons_per_module {
            let lesson = Lesson::new(format!("lesson {m}.{l}"), LessonType::Video, 5).unwrap();
            course.add_lesson(module_id, lesson).unwrap();
        }
    }
    for criterion in CompletionCriterion::ALL {
        let value = if criterion.uses_required_value() { 1 } else { 0 };
        course
            .add_completion_requirement(criterion, value, true, "")
            .unwrap();
    }
    course
}

fn bench_check_completion(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_completion");
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    for (modules, lessons) in [(2, 5), (20, 25)] {
        let course = make_course(modules, lessons);
        let mut enrollment = course.enroll(Uuid::new_v4(), now);
        for lesson in course.lesson_ids() {
            enrollment.complete_lesson(lesson, now).unwrap();
        }
        group.bench_function(format!("{}_lessons", modules * lessons), |b| {
            b.iter(|| course.check_enrollment_completion(black_box(&enrollment), now))
        });
    }

    group.finish();
}

#[derive(Debug, Clone)]
struct Item {
    id: Uuid,
    order_index: usize,
}

impl Ordered for Item {
    const KIND: &'static str = "item";

    fn id(&self) -> Uuid {
        self.id
    }
    fn order_index(&self) -> usize {
        self.order_index
    }
    fn set_order_index(&mut self, index: usize) {
        self.order_index = index;
    }
}

fn bench_reindex(c: &mut Criterion) {
    let mut group = c.benchmark_group("reindex");

    let mut collection = OrderedCollection::new();
    for _ in 0..500 {
        collection
            .push(Item {
                id: Uuid::new_v4(),
                order_index: 0,
            })
            .unwrap();
    }
    let mut reversed = collection.ids();
    reversed.reverse();

    group.bench_function("reorder_500", |b| {
        b.iter(|| {
            let mut c = collection.clone();
            c.reorder(black_box(&reversed)).unwrap();
            c
        })
    });

    group.bench_function("insert_front_500", |b| {
        b.iter(|| {
            let mut c = collection.clone();
            c.insert_at(
                0,
                Item {
                    id: Uuid::new_v4(),
                    order_index: 0,
                },
            )
            .unwrap();
            c
        })
    });

    group.finish();
}

criterion_group!(benches, bench_check_completion, bench_reindex);
criterion_main!(benches);
